//! Constant pool for compiled modules.
//!
//! The constant pool stores values that are referenced by bytecode
//! instructions: numeric literals and raw data blobs for aggregate
//! initializers.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// 32-bit integer; pushed zero-extended into its slot.
    I32(i32),
    /// 64-bit integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Raw data blob for byte-array and aggregate initializers.
    ///
    /// Pushing a `Bytes` entry pushes the address of the blob's read-only
    /// storage, not the data itself.
    Bytes(Vec<u8>),
}

/// Module-level constant pool with deduplication.
///
/// Shared across all methods in a module to avoid duplicate values.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// The actual constants.
    constants: Vec<Constant>,
    /// Deduplication index: maps constant to its index.
    index: FxHashMap<ConstantKey, u16>,
}

/// Key for constant deduplication (hashable version of Constant).
///
/// Floats are keyed by their ordered wrapper, so -0.0 and 0.0 stay
/// distinct entries and NaN payloads dedup by bit identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    I32(i32),
    I64(i64),
    F32(OrderedFloat<f32>),
    F64(OrderedFloat<f64>),
    Bytes(Vec<u8>),
}

impl ConstantPool {
    /// Create a new empty constant pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a constant pool with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constants: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Add or get existing constant, returns index.
    ///
    /// Deduplicates identical constants.
    ///
    /// # Panics
    ///
    /// Panics if the pool grows past u16::MAX entries, the widest index
    /// the instruction encoding carries.
    pub fn add(&mut self, constant: Constant) -> u16 {
        let key = Self::to_key(&constant);

        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        assert!(
            self.constants.len() < u16::MAX as usize,
            "constant pool overflow"
        );
        let idx = self.constants.len() as u16;
        self.constants.push(constant);
        self.index.insert(key, idx);
        idx
    }

    /// Add a 32-bit integer constant.
    pub fn add_i32(&mut self, value: i32) -> u16 {
        self.add(Constant::I32(value))
    }

    /// Add a 64-bit integer constant.
    pub fn add_i64(&mut self, value: i64) -> u16 {
        self.add(Constant::I64(value))
    }

    /// Add a 32-bit float constant.
    pub fn add_f32(&mut self, value: f32) -> u16 {
        self.add(Constant::F32(value))
    }

    /// Add a 64-bit float constant.
    pub fn add_f64(&mut self, value: f64) -> u16 {
        self.add(Constant::F64(value))
    }

    /// Add a raw data blob.
    pub fn add_bytes(&mut self, data: Vec<u8>) -> u16 {
        self.add(Constant::Bytes(data))
    }

    /// Get constant by index.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// Get all constants (for serialization).
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Number of constants.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Convert a Constant to its hashable key representation.
    fn to_key(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::I32(v) => ConstantKey::I32(*v),
            Constant::I64(v) => ConstantKey::I64(*v),
            Constant::F32(v) => ConstantKey::F32(OrderedFloat(*v)),
            Constant::F64(v) => ConstantKey::F64(OrderedFloat(*v)),
            Constant::Bytes(b) => ConstantKey::Bytes(b.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty() {
        let pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn add_ints() {
        let mut pool = ConstantPool::new();
        let idx32 = pool.add_i32(42);
        let idx64 = pool.add_i64(42);

        assert_eq!(idx32, 0);
        assert_eq!(idx64, 1);
        assert_eq!(pool.get(idx32), Some(&Constant::I32(42)));
        assert_eq!(pool.get(idx64), Some(&Constant::I64(42)));
    }

    #[test]
    fn widths_do_not_dedup_across() {
        let mut pool = ConstantPool::new();

        // The same numeric value at different widths pushes differently,
        // so each width keeps its own entry.
        let a = pool.add_i32(7);
        let b = pool.add_i64(7);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn add_floats() {
        let mut pool = ConstantPool::new();
        let idx32 = pool.add_f32(1.5);
        let idx64 = pool.add_f64(2.5);

        assert_eq!(idx32, 0);
        assert_eq!(idx64, 1);
        assert!(matches!(pool.get(idx32), Some(Constant::F32(v)) if (*v - 1.5).abs() < 0.001));
    }

    #[test]
    fn add_bytes() {
        let mut pool = ConstantPool::new();
        let idx = pool.add_bytes(b"\x01\x02\x03".to_vec());
        assert_eq!(idx, 0);
        assert_eq!(pool.get(idx), Some(&Constant::Bytes(b"\x01\x02\x03".to_vec())));
    }

    #[test]
    fn deduplication() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add_i32(100);
        let idx2 = pool.add_i32(200);
        let idx3 = pool.add_i32(100); // Duplicate

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 0); // Same as idx1
        assert_eq!(pool.len(), 2); // Only 2 unique constants
    }

    #[test]
    fn float_deduplication() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add_f64(1.0);
        let idx2 = pool.add_f64(1.0);

        assert_eq!(idx1, idx2);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn signed_zeroes_stay_distinct() {
        let mut pool = ConstantPool::new();

        let pos = pool.add_f32(0.0);
        let neg = pool.add_f32(-0.0);

        assert_ne!(pos, neg);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn bytes_deduplication() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add_bytes(b"test".to_vec());
        let idx2 = pool.add_bytes(b"other".to_vec());
        let idx3 = pool.add_bytes(b"test".to_vec()); // Duplicate

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 0); // Same as idx1
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn get_out_of_bounds() {
        let pool = ConstantPool::new();
        assert_eq!(pool.get(0), None);
        assert_eq!(pool.get(100), None);
    }

    #[test]
    fn constants_slice() {
        let mut pool = ConstantPool::new();
        pool.add_i32(1);
        pool.add_i32(2);
        pool.add_i32(3);

        let constants = pool.constants();
        assert_eq!(constants.len(), 3);
        assert_eq!(constants[0], Constant::I32(1));
        assert_eq!(constants[1], Constant::I32(2));
        assert_eq!(constants[2], Constant::I32(3));
    }
}
