//! The IR type system.
//!
//! Types are structural: two values of `IrType` that compare equal *are* the
//! same type, and the compiler memoizes per distinct value. Pointers are
//! opaque (no pointee type), which keeps the tree finite — only arrays,
//! vectors, and structs nest.

use std::fmt;

/// A first-class type in the source IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// The absence of a value. Only valid as a function return type.
    Void,
    /// Integer of the given bit width. The compiler accepts widths
    /// {1, 8, 16, 32, 64}; anything else is rejected during type mapping.
    Int(u32),
    /// 32-bit IEEE binary float.
    Float,
    /// 64-bit IEEE binary float.
    Double,
    /// Opaque pointer. Address-sized, no pointee.
    Ptr,
    /// Fixed-length inline array.
    Array { elem: Box<IrType>, len: u64 },
    /// Fixed-lane-count vector of a scalar element type.
    Vector { elem: Box<IrType>, lanes: u32 },
    /// Struct with fields laid out in declaration order.
    Struct { fields: Vec<IrType>, packed: bool },
}

impl IrType {
    /// The 1-bit integer (boolean) type.
    pub const I1: IrType = IrType::Int(1);
    /// The 8-bit integer type.
    pub const I8: IrType = IrType::Int(8);
    /// The 16-bit integer type.
    pub const I16: IrType = IrType::Int(16);
    /// The 32-bit integer type.
    pub const I32: IrType = IrType::Int(32);
    /// The 64-bit integer type.
    pub const I64: IrType = IrType::Int(64);

    /// Build an array type.
    pub fn array(elem: IrType, len: u64) -> Self {
        IrType::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Build a vector type.
    pub fn vector(elem: IrType, lanes: u32) -> Self {
        IrType::Vector {
            elem: Box::new(elem),
            lanes,
        }
    }

    /// Build a non-packed struct type.
    pub fn structure(fields: Vec<IrType>) -> Self {
        IrType::Struct {
            fields,
            packed: false,
        }
    }

    /// Build a packed struct type (1-byte field alignment).
    pub fn packed_structure(fields: Vec<IrType>) -> Self {
        IrType::Struct {
            fields,
            packed: true,
        }
    }

    /// Check if this is the void type.
    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    /// Check if this is an integer type of any width.
    pub fn is_int(&self) -> bool {
        matches!(self, IrType::Int(_))
    }

    /// Check if this is `float` or `double`.
    pub fn is_float(&self) -> bool {
        matches!(self, IrType::Float | IrType::Double)
    }

    /// Check if this is the pointer type.
    pub fn is_ptr(&self) -> bool {
        matches!(self, IrType::Ptr)
    }

    /// Check if this is a vector type.
    pub fn is_vector(&self) -> bool {
        matches!(self, IrType::Vector { .. })
    }

    /// Check if this is an array or struct type.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, IrType::Array { .. } | IrType::Struct { .. })
    }

    /// Get the bit width of an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            IrType::Int(w) => Some(*w),
            _ => None,
        }
    }

    /// Get the element type and lane count of a vector type.
    pub fn vector_parts(&self) -> Option<(&IrType, u32)> {
        match self {
            IrType::Vector { elem, lanes } => Some((elem, *lanes)),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(w) => write!(f, "i{w}"),
            IrType::Float => write!(f, "float"),
            IrType::Double => write!(f, "double"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            IrType::Vector { elem, lanes } => write!(f, "<{lanes} x {elem}>"),
            IrType::Struct { fields, packed } => {
                if *packed {
                    write!(f, "<{{ ")?;
                } else {
                    write!(f, "{{ ")?;
                }
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                if *packed { write!(f, " }}>") } else { write!(f, " }}") }
            }
        }
    }
}

/// A function signature: parameter types, return type, variadic flag.
///
/// Signatures appear on functions and on indirect call sites. An indirect
/// call through a variadic signature carries the full fixed-plus-variadic
/// parameter list of that particular site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnSig {
    /// Parameter types in order.
    pub params: Vec<IrType>,
    /// Return type. `Void` for no return value.
    pub ret: IrType,
    /// Whether the callee accepts extra arguments past `params`.
    pub varargs: bool,
}

impl FnSig {
    /// Build a fixed-arity signature.
    pub fn new(params: Vec<IrType>, ret: IrType) -> Self {
        FnSig {
            params,
            ret,
            varargs: false,
        }
    }

    /// Build a variadic signature. `params` holds the fixed part.
    pub fn varargs(params: Vec<IrType>, ret: IrType) -> Self {
        FnSig {
            params,
            ret,
            varargs: true,
        }
    }
}

impl fmt::Display for FnSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.varargs {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
