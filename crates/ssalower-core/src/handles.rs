//! Handles into the emitted target module.
//!
//! Pass 1 of the module compiler assigns every global a [`FieldHandle`] and
//! every materialized function a [`MethodHandle`]; pass 2 resolves all
//! references through those handles. Handles are plain dense indices into
//! the target module's tables - stable for the lifetime of the module,
//! meaningless outside it.
//!
//! [`TypeToken`] is different: it is a deterministic structural hash
//! identifying a synthesized aggregate type, computed before the type is
//! ever registered, so recursive and forward-referencing shapes need no
//! ordering discipline.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Identifies a method definition in the target module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandle(u32);

impl MethodHandle {
    /// Create a new method handle with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method_{}", self.0)
    }
}

/// Identifies a global's backing static storage in the target module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(u32);

impl FieldHandle {
    /// Create a new field handle with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field_{}", self.0)
    }
}

/// Identifies an interned call-site signature in the target module.
///
/// Indirect calls and variadic call sites each record the exact signature
/// used at that site; identical signatures share one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigHandle(u32);

impl SigHandle {
    /// Create a new signature handle with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig_{}", self.0)
    }
}

/// Identifies an imported host-runtime builtin (math or vector API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(u32);

impl HostId {
    /// Create a new host import ID with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host_{}", self.0)
    }
}

/// Domain-mixing constants for [`TypeToken`] computation.
///
/// Struct, array, and vector shapes get distinct domains so that, say, an
/// array of 2 i32s and a struct of 2 i32s never collide.
mod token_constants {
    pub const STRUCT: u64 = 0x6f1d3c5a92b8e407;
    pub const ARRAY: u64 = 0x1bc84f6e07d2a593;
    pub const VECTOR: u64 = 0x9e25a81d4c7f3b60;
}

/// A deterministic 64-bit structural identity for a synthesized target type.
///
/// Computed from the shape description alone, so the same IR type always
/// yields the same token regardless of synthesis order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeToken(pub u64);

impl TypeToken {
    /// Token for a synthesized struct, from its field description bytes.
    ///
    /// The caller encodes the field layout (offsets and element tokens or
    /// scalar kinds) into `desc`; equal descriptions yield equal tokens.
    #[inline]
    pub fn for_struct(desc: &[u8]) -> Self {
        TypeToken(token_constants::STRUCT ^ xxh64(desc, 0))
    }

    /// Token for a synthesized fixed-length array of `len` elements.
    #[inline]
    pub fn for_array(elem: TypeToken, len: u64) -> Self {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&elem.0.to_le_bytes());
        buf[8..].copy_from_slice(&len.to_le_bytes());
        TypeToken(token_constants::ARRAY ^ xxh64(&buf, 0))
    }

    /// Token for a scalar element inside an aggregate description.
    ///
    /// Scalars are not synthesized types themselves; this exists so struct
    /// and array descriptions can reference them uniformly.
    #[inline]
    pub fn for_scalar(kind: u8, bits: u32) -> Self {
        let mut buf = [0u8; 5];
        buf[0] = kind;
        buf[1..].copy_from_slice(&bits.to_le_bytes());
        TypeToken(xxh64(&buf, 0))
    }

    /// Token for a software vector fallback of `lanes` elements.
    #[inline]
    pub fn for_vector(elem: TypeToken, lanes: u64) -> Self {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&elem.0.to_le_bytes());
        buf[8..].copy_from_slice(&lanes.to_le_bytes());
        TypeToken(token_constants::VECTOR ^ xxh64(&buf, 0))
    }

    /// Get the underlying value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeToken({:#018x})", self.0)
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
