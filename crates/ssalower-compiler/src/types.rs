//! Mapping from IR types to target compute types.
//!
//! Scalars map to slot types directly. Vectors whose lane kind and total
//! width fit a SIMD register bucket map to a [`VecShape`]; everything
//! else - structs, arrays, and vectors no bucket can hold - becomes an
//! [`TargetType::Aggregate`] identified by a structural [`TypeToken`],
//! with a synthesized [`TargetTypeDef`] recording its layout.
//!
//! Mapping is memoized per module: the same IR type always yields the
//! same target type and registers its definitions exactly once.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use ssalower_core::{CompileError, Result, TypeToken};
use ssalower_ir::{DataLayout, FnSig, IrType};

use crate::target::{MethodSig, SigType};

/// Lane element kind of a SIMD-mapped vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemKind {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElemKind {
    /// Lane width in bits.
    pub fn bits(self) -> u64 {
        match self {
            ElemKind::I8 => 8,
            ElemKind::I16 => 16,
            ElemKind::I32 => 32,
            ElemKind::I64 => 64,
            ElemKind::F32 => 32,
            ElemKind::F64 => 64,
        }
    }

    /// Lane width in bytes.
    pub fn size(self) -> u64 {
        self.bits() / 8
    }

    /// Suffix used in host builtin names ("vec128.add.i32").
    pub fn name(self) -> &'static str {
        match self {
            ElemKind::I8 => "i8",
            ElemKind::I16 => "i16",
            ElemKind::I32 => "i32",
            ElemKind::I64 => "i64",
            ElemKind::F32 => "f32",
            ElemKind::F64 => "f64",
        }
    }

    /// The lane kind of an IR scalar, if it has one. i1 has none: masks
    /// take the byte-lane fallback path.
    pub fn of(ty: &IrType) -> Option<ElemKind> {
        match ty {
            IrType::Int(8) => Some(ElemKind::I8),
            IrType::Int(16) => Some(ElemKind::I16),
            IrType::Int(32) => Some(ElemKind::I32),
            IrType::Int(64) => Some(ElemKind::I64),
            IrType::Float => Some(ElemKind::F32),
            IrType::Double => Some(ElemKind::F64),
            _ => None,
        }
    }
}

/// Shape of a vector mapped onto a SIMD register bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VecShape {
    /// Register bucket width in bits: 16, 32, 64, 128, 256 or 512.
    pub bits: u32,
    pub elem: ElemKind,
    pub lanes: u32,
}

/// A target compute type.
///
/// Sub-32-bit integers compute in i32 slots; the mapper collapses i1 to
/// `I8` for storage, and the selector re-narrows values with the
/// conversion opcodes where width matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Unit,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Ptr,
    Vector(VecShape),
    Aggregate(TypeToken),
}

/// Opcode family a scalar's slot operations draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotFamily {
    I32,
    I64,
    F32,
    F64,
    Ptr,
}

impl TargetType {
    /// True for values that live in addressable storage rather than slots.
    pub fn is_buffer(&self) -> bool {
        matches!(self, TargetType::Vector(_) | TargetType::Aggregate(_))
    }

    pub(crate) fn family(&self) -> Option<SlotFamily> {
        match self {
            TargetType::I8 | TargetType::I16 | TargetType::I32 => Some(SlotFamily::I32),
            TargetType::I64 => Some(SlotFamily::I64),
            TargetType::F32 => Some(SlotFamily::F32),
            TargetType::F64 => Some(SlotFamily::F64),
            TargetType::Ptr => Some(SlotFamily::Ptr),
            TargetType::Unit | TargetType::Vector(_) | TargetType::Aggregate(_) => None,
        }
    }
}

/// One field of a synthesized struct definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateField {
    pub offset: u64,
    pub ty: TargetType,
}

/// Shape of a synthesized type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetTypeKind {
    Struct { fields: Vec<AggregateField> },
    Array { elem: TargetType, len: u64, stride: u64 },
    /// Software vector fallback: a fixed element array with the source
    /// vector's bit layout.
    Vector { elem: TargetType, lanes: u32, stride: u64 },
}

/// A synthesized aggregate or fallback-vector type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTypeDef {
    pub token: TypeToken,
    pub size: u64,
    pub align: u64,
    pub kind: TargetTypeKind,
}

/// SIMD register buckets, smallest first.
const SIMD_BUCKETS: [u32; 6] = [16, 32, 64, 128, 256, 512];

fn simd_bucket(bits: u64) -> Option<u32> {
    SIMD_BUCKETS
        .iter()
        .copied()
        .find(|&bucket| bits <= bucket as u64)
}

/// Memoizing IR-to-target type mapper.
pub struct TypeMapper<'a> {
    layout: &'a DataLayout,
    cache: RefCell<FxHashMap<IrType, TargetType>>,
    defs: RefCell<Vec<TargetTypeDef>>,
    def_index: RefCell<FxHashMap<TypeToken, usize>>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(layout: &'a DataLayout) -> Self {
        Self {
            layout,
            cache: RefCell::new(FxHashMap::default()),
            defs: RefCell::new(Vec::new()),
            def_index: RefCell::new(FxHashMap::default()),
        }
    }

    /// Storage size of an IR type in bytes.
    pub fn size_of(&self, ty: &IrType) -> u64 {
        self.layout.size_in_bytes(ty)
    }

    /// Storage size of an IR type in bits.
    pub fn bits_of(&self, ty: &IrType) -> u64 {
        self.layout.size_in_bits(ty)
    }

    /// ABI alignment of an IR type in bytes.
    pub fn align_of(&self, ty: &IrType) -> u64 {
        self.layout.abi_align(ty)
    }

    /// Map an IR type to its target compute type, synthesizing and
    /// registering aggregate definitions as needed.
    pub fn map(&self, ty: &IrType) -> Result<TargetType> {
        if let Some(mapped) = self.cache.borrow().get(ty) {
            return Ok(*mapped);
        }

        let mapped = self.compute(ty)?;
        self.cache.borrow_mut().insert(ty.clone(), mapped);
        Ok(mapped)
    }

    /// Map an IR type to its calling-convention slot type. Buffer types
    /// pass by address with their byte size recorded in the signature.
    pub fn sig_type(&self, ty: &IrType) -> Result<SigType> {
        Ok(match self.map(ty)? {
            TargetType::I8 | TargetType::I16 | TargetType::I32 => SigType::I32,
            TargetType::I64 => SigType::I64,
            TargetType::F32 => SigType::F32,
            TargetType::F64 => SigType::F64,
            TargetType::Ptr => SigType::Ptr,
            TargetType::Vector(_) | TargetType::Aggregate(_) => SigType::Buffer {
                size: self.size_of(ty),
            },
            TargetType::Unit => {
                return Err(CompileError::unsupported_type(
                    ty.to_string(),
                    "void is only a return type",
                ));
            }
        })
    }

    /// Build the signature shape of a function or call site.
    pub fn method_sig(&self, sig: &FnSig) -> Result<MethodSig> {
        let mut params = Vec::with_capacity(sig.params.len());
        for ty in &sig.params {
            params.push(self.sig_type(ty)?);
        }
        let ret = match &sig.ret {
            IrType::Void => None,
            ty => Some(self.sig_type(ty)?),
        };
        Ok(MethodSig::new(params, ret))
    }

    /// Drain the synthesized definitions, in first-registration order.
    pub fn take_defs(&self) -> Vec<TargetTypeDef> {
        std::mem::take(&mut *self.defs.borrow_mut())
    }

    fn compute(&self, ty: &IrType) -> Result<TargetType> {
        match ty {
            IrType::Void => Ok(TargetType::Unit),
            IrType::Int(1) | IrType::Int(8) => Ok(TargetType::I8),
            IrType::Int(16) => Ok(TargetType::I16),
            IrType::Int(32) => Ok(TargetType::I32),
            IrType::Int(64) => Ok(TargetType::I64),
            IrType::Int(width) => Err(CompileError::unsupported_type(
                ty.to_string(),
                format!("{width}-bit integers have no target representation"),
            )),
            IrType::Float => Ok(TargetType::F32),
            IrType::Double => Ok(TargetType::F64),
            IrType::Ptr => Ok(TargetType::Ptr),
            IrType::Vector { elem, lanes } => self.map_vector(ty, elem, *lanes),
            IrType::Array { elem, len } => self.map_array(ty, elem, *len),
            IrType::Struct { fields, packed } => {
                if *packed {
                    return Err(CompileError::unsupported_type(
                        ty.to_string(),
                        "packed struct layouts are not supported",
                    ));
                }
                self.map_struct(ty, fields)
            }
        }
    }

    fn map_vector(&self, ty: &IrType, elem: &IrType, lanes: u32) -> Result<TargetType> {
        let mapped_elem = self.map(elem)?;
        if mapped_elem.is_buffer() || mapped_elem == TargetType::Unit {
            return Err(CompileError::unsupported_type(
                ty.to_string(),
                "vector elements must be scalar",
            ));
        }

        if let Some(kind) = ElemKind::of(elem) {
            let bits = kind.bits() * lanes as u64;
            if let Some(bucket) = simd_bucket(bits) {
                return Ok(TargetType::Vector(VecShape {
                    bits: bucket,
                    elem: kind,
                    lanes,
                }));
            }
        }

        // Off-bucket widths, i1 masks and pointer lanes fall back to a
        // software element array with the vector's bit layout.
        let token = TypeToken::for_vector(scalar_token(mapped_elem), lanes as u64);
        self.register_def(TargetTypeDef {
            token,
            size: self.layout.size_in_bytes(ty),
            align: self.layout.abi_align(ty),
            kind: TargetTypeKind::Vector {
                elem: mapped_elem,
                lanes,
                stride: self.layout.size_in_bytes(elem),
            },
        });
        Ok(TargetType::Aggregate(token))
    }

    fn map_array(&self, ty: &IrType, elem: &IrType, len: u64) -> Result<TargetType> {
        let mapped_elem = self.map(elem)?;
        let token = TypeToken::for_array(self.token_of(mapped_elem), len);
        self.register_def(TargetTypeDef {
            token,
            size: self.layout.size_in_bytes(ty),
            align: self.layout.abi_align(ty),
            kind: TargetTypeKind::Array {
                elem: mapped_elem,
                len,
                stride: self.layout.size_in_bytes(elem),
            },
        });
        Ok(TargetType::Aggregate(token))
    }

    fn map_struct(&self, ty: &IrType, fields: &[IrType]) -> Result<TargetType> {
        let mut mapped = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let field_ty = self.map(field)?;
            let offset = self
                .layout
                .struct_field_offset(fields, false, index)
                .unwrap_or(0);
            mapped.push(AggregateField {
                offset,
                ty: field_ty,
            });
        }

        // 16 bytes per field: offset then element token, little-endian.
        let mut desc = Vec::with_capacity(mapped.len() * 16);
        for field in &mapped {
            desc.extend_from_slice(&field.offset.to_le_bytes());
            desc.extend_from_slice(&self.token_of(field.ty).as_u64().to_le_bytes());
        }
        let token = TypeToken::for_struct(&desc);

        self.register_def(TargetTypeDef {
            token,
            size: self.layout.size_in_bytes(ty),
            align: self.layout.abi_align(ty),
            kind: TargetTypeKind::Struct { fields: mapped },
        });
        Ok(TargetType::Aggregate(token))
    }

    fn token_of(&self, ty: TargetType) -> TypeToken {
        match ty {
            TargetType::Aggregate(token) => token,
            other => scalar_token(other),
        }
    }

    fn register_def(&self, def: TargetTypeDef) {
        let mut index = self.def_index.borrow_mut();
        if index.contains_key(&def.token) {
            return;
        }
        let mut defs = self.defs.borrow_mut();
        index.insert(def.token, defs.len());
        defs.push(def);
    }
}

/// Structural token for a non-aggregate element referenced from a
/// definition. Kind bytes: 0 integer, 1 float, 2 pointer, 3 unit.
fn scalar_token(ty: TargetType) -> TypeToken {
    match ty {
        TargetType::Unit => TypeToken::for_scalar(3, 0),
        TargetType::I8 => TypeToken::for_scalar(0, 8),
        TargetType::I16 => TypeToken::for_scalar(0, 16),
        TargetType::I32 => TypeToken::for_scalar(0, 32),
        TargetType::I64 => TypeToken::for_scalar(0, 64),
        TargetType::F32 => TypeToken::for_scalar(1, 32),
        TargetType::F64 => TypeToken::for_scalar(1, 64),
        TargetType::Ptr => TypeToken::for_scalar(2, 64),
        TargetType::Vector(shape) => TypeToken::for_vector(
            TypeToken::for_scalar(
                if matches!(shape.elem, ElemKind::F32 | ElemKind::F64) { 1 } else { 0 },
                shape.elem.bits() as u32,
            ),
            shape.lanes as u64,
        ),
        TargetType::Aggregate(token) => token,
    }
}
