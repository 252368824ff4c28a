//! The module constant pool.
//!
//! Constants live in one module-wide pool and are referenced by [`ConstId`].
//! Composite constants (arrays, structs, vectors, constant GEPs) reference
//! their parts through the pool as well, so the whole graph is id-indexed.

use crate::ids::{ConstId, FuncId, GlobalId};
use crate::types::IrType;

/// An entry in the module constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Integer constant. `value` holds the bit pattern sign-extended to 64
    /// bits; `ty` carries the width.
    Int { value: i64, ty: IrType },
    /// 32-bit float constant.
    Float32(f32),
    /// 64-bit float constant.
    Float64(f64),
    /// The null pointer.
    Null,
    /// All-zero value of any type.
    Zero(IrType),
    /// Undefined value of any type. Lowered as zero.
    Undef(IrType),
    /// Raw bytes with a declared type, typically string or array data.
    Bytes { data: Vec<u8>, ty: IrType },
    /// Array built from pooled elements.
    Array { elems: Vec<ConstId>, ty: IrType },
    /// Struct built from pooled fields.
    Struct { fields: Vec<ConstId>, ty: IrType },
    /// Vector built from pooled lanes.
    Vector { elems: Vec<ConstId>, ty: IrType },
    /// Address of a global.
    GlobalAddr(GlobalId),
    /// Address of a function.
    FuncAddr(FuncId),
    /// Constant-folded address computation: a base address plus a
    /// compile-time index chain through `source_ty`.
    Gep {
        base: ConstId,
        source_ty: IrType,
        indices: Vec<ConstId>,
    },
}

impl Constant {
    /// Build an `i32` constant.
    pub fn i32(value: i32) -> Self {
        Constant::Int {
            value: i64::from(value),
            ty: IrType::I32,
        }
    }

    /// Build an `i64` constant.
    pub fn i64(value: i64) -> Self {
        Constant::Int {
            value,
            ty: IrType::I64,
        }
    }

    /// Build an `i1` constant.
    pub fn bool(value: bool) -> Self {
        Constant::Int {
            value: i64::from(value),
            ty: IrType::I1,
        }
    }

    /// The type of this constant.
    pub fn ty(&self) -> IrType {
        match self {
            Constant::Int { ty, .. } => ty.clone(),
            Constant::Float32(_) => IrType::Float,
            Constant::Float64(_) => IrType::Double,
            Constant::Null => IrType::Ptr,
            Constant::Zero(ty) | Constant::Undef(ty) => ty.clone(),
            Constant::Bytes { ty, .. } => ty.clone(),
            Constant::Array { ty, .. } => ty.clone(),
            Constant::Struct { ty, .. } => ty.clone(),
            Constant::Vector { ty, .. } => ty.clone(),
            Constant::GlobalAddr(_) | Constant::FuncAddr(_) | Constant::Gep { .. } => IrType::Ptr,
        }
    }

    /// The integer value of this constant, if it has one.
    ///
    /// `Zero` of an integer type reads as 0.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int { value, .. } => Some(*value),
            Constant::Zero(ty) if ty.is_int() => Some(0),
            _ => None,
        }
    }

    /// Check if this is an undefined value.
    pub fn is_undef(&self) -> bool {
        matches!(self, Constant::Undef(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types() {
        assert_eq!(Constant::i32(5).ty(), IrType::I32);
        assert_eq!(Constant::i64(-1).ty(), IrType::I64);
        assert_eq!(Constant::bool(true).ty(), IrType::I1);
        assert_eq!(Constant::Float32(1.5).ty(), IrType::Float);
        assert_eq!(Constant::Null.ty(), IrType::Ptr);
        assert_eq!(Constant::GlobalAddr(GlobalId::new(0)).ty(), IrType::Ptr);
    }

    #[test]
    fn composite_types_carry_their_declared_type() {
        let arr = Constant::Bytes {
            data: vec![1, 2, 3, 4],
            ty: IrType::array(IrType::I8, 4),
        };
        assert_eq!(arr.ty(), IrType::array(IrType::I8, 4));
        assert_eq!(Constant::Zero(IrType::vector(IrType::Float, 4)).ty().is_vector(), true);
    }

    #[test]
    fn as_int_reads_integers_and_zero() {
        assert_eq!(Constant::i32(7).as_int(), Some(7));
        assert_eq!(Constant::bool(true).as_int(), Some(1));
        assert_eq!(Constant::Zero(IrType::I64).as_int(), Some(0));
        assert_eq!(Constant::Zero(IrType::Ptr).as_int(), None);
        assert_eq!(Constant::Float32(1.0).as_int(), None);
    }
}
