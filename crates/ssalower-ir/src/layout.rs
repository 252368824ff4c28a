//! Data layout oracle.
//!
//! Answers every size, alignment, and offset question the backend asks, so
//! lowering never hard-codes a layout rule. The model is the declared layout
//! of the source module: 64-bit pointers, sequential struct layout with
//! per-field alignment padding (packed structs pad nothing), arrays with
//! stride equal to element size, and vectors padded to a power-of-two byte
//! size that doubles as their alignment.

use crate::types::IrType;

/// Layout rules for a module.
///
/// Sizes are *storage* sizes: `i1` occupies one byte, and a vector's size
/// includes its power-of-two padding, so array stride is always equal to
/// element size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataLayout;

/// Pointer size in bytes.
pub const POINTER_SIZE: u64 = 8;

impl DataLayout {
    /// Create the layout oracle.
    pub fn new() -> Self {
        DataLayout
    }

    /// Storage size of a type in bytes.
    pub fn size_in_bytes(&self, ty: &IrType) -> u64 {
        match ty {
            IrType::Void => 0,
            IrType::Int(w) => u64::from(w + 7) / 8,
            IrType::Float => 4,
            IrType::Double => 8,
            IrType::Ptr => POINTER_SIZE,
            IrType::Array { elem, len } => self.size_in_bytes(elem) * len,
            IrType::Vector { elem, lanes } => {
                vector_layout(self.size_in_bytes(elem), *lanes).0
            }
            IrType::Struct { fields, packed } => self.struct_size(fields, *packed),
        }
    }

    /// Storage size of a type in bits.
    pub fn size_in_bits(&self, ty: &IrType) -> u64 {
        self.size_in_bytes(ty) * 8
    }

    /// ABI alignment of a type in bytes. Always a power of two, never zero.
    pub fn abi_align(&self, ty: &IrType) -> u64 {
        match ty {
            IrType::Void => 1,
            IrType::Int(w) => (u64::from(w + 7) / 8).clamp(1, 8),
            IrType::Float => 4,
            IrType::Double => 8,
            IrType::Ptr => POINTER_SIZE,
            IrType::Array { elem, .. } => self.abi_align(elem),
            IrType::Vector { elem, lanes } => {
                vector_layout(self.size_in_bytes(elem), *lanes).1
            }
            IrType::Struct { fields, packed } => {
                if *packed {
                    1
                } else {
                    fields
                        .iter()
                        .map(|f| self.abi_align(f))
                        .max()
                        .unwrap_or(1)
                }
            }
        }
    }

    /// Byte offset of field `index` in a struct with the given fields.
    ///
    /// `None` if `index` is out of range.
    pub fn struct_field_offset(
        &self,
        fields: &[IrType],
        packed: bool,
        index: usize,
    ) -> Option<u64> {
        if index >= fields.len() {
            return None;
        }
        let mut offset = 0u64;
        for (i, field) in fields.iter().enumerate() {
            if !packed {
                offset = align_to(offset, self.abi_align(field));
            }
            if i == index {
                return Some(offset);
            }
            offset += self.size_in_bytes(field);
        }
        None
    }

    /// Total size of a struct with the given fields, tail padding included.
    pub fn struct_size(&self, fields: &[IrType], packed: bool) -> u64 {
        let mut offset = 0u64;
        let mut max_align = 1u64;
        for field in fields {
            let align = if packed { 1 } else { self.abi_align(field) };
            max_align = max_align.max(align);
            offset = align_to(offset, align);
            offset += self.size_in_bytes(field);
        }
        align_to(offset, max_align)
    }
}

/// Round `offset` up to a multiple of `align`. `align` must be non-zero.
pub fn align_to(offset: u64, align: u64) -> u64 {
    offset.div_ceil(align) * align
}

// Vector storage is padded to the next power of two so arrays of vectors
// keep every element aligned; the padded size is also the alignment.
fn vector_layout(elem_size: u64, lanes: u32) -> (u64, u64) {
    let raw = elem_size * u64::from(lanes);
    if raw == 0 {
        return (0, 1);
    }
    let padded = raw.next_power_of_two();
    (padded, padded)
}
