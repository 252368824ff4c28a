//! Bytecode operation codes.
//!
//! This module defines the instruction set the selector lowers into.
//! Each opcode is a single byte, with operands following inline in
//! big-endian order.
//!
//! The machine is stack-based over 64-bit slots. Operations in the
//! `I32` family read the low 32 bits of their operand slots and write
//! their result zero-extended, so the upper half of an i32 result is
//! always zero. Narrower integers are kept widened in their slots and
//! re-narrowed with the `ConvI32*` opcodes. Vectors and aggregates are
//! not slot values; their slot representation is the address of their
//! backing storage.

use num_enum::TryFromPrimitive;

/// Bytecode operation codes.
///
/// Comparison opcodes push an i32 that is 0 or 1. Fused branch opcodes
/// combine a comparison with a forward jump taken when the comparison
/// holds. Float comparisons are ordered: any comparison against NaN
/// yields 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool (8-bit index).
    /// Operand: u8 constant index
    Constant = 0,
    /// Push constant from pool (16-bit index).
    /// Operand: u16 constant index (big-endian)
    ConstantWide,
    /// Push an all-zero slot (integer 0, float +0.0, null address).
    PushZero,
    /// Push integer 1.
    PushOne,
    /// Push null pointer.
    PushNull,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    /// Duplicate top of stack.
    Dup,
    /// Pop top of stack.
    Pop,

    // =========================================================================
    // Local Variables
    // =========================================================================
    /// Load local slot (8-bit index).
    /// Operand: u8 slot index
    GetLocal,
    /// Store to local slot (8-bit index).
    /// Operand: u8 slot index
    SetLocal,
    /// Push the address of a buffer local (8-bit index).
    /// Operand: u8 local index
    LocalAddr,
    /// Load local slot (16-bit index).
    /// Operand: u16 slot index (big-endian)
    GetLocalWide,
    /// Store to local slot (16-bit index).
    /// Operand: u16 slot index (big-endian)
    SetLocalWide,
    /// Push the address of a buffer local (16-bit index).
    /// Operand: u16 local index (big-endian)
    LocalAddrWide,

    // =========================================================================
    // Globals
    // =========================================================================
    /// Push the address of a global's backing storage.
    /// Operand: u16 field index (big-endian)
    GlobalAddr,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    /// Add two i32 values.
    AddI32,
    /// Add two i64 values.
    AddI64,
    /// Add two f32 values.
    AddF32,
    /// Add two f64 values.
    AddF64,
    /// Subtract two i32 values.
    SubI32,
    /// Subtract two i64 values.
    SubI64,
    /// Subtract two f32 values.
    SubF32,
    /// Subtract two f64 values.
    SubF64,
    /// Multiply two i32 values.
    MulI32,
    /// Multiply two i64 values.
    MulI64,
    /// Multiply two f32 values.
    MulF32,
    /// Multiply two f64 values.
    MulF64,
    /// Divide two i32 values (signed).
    DivI32,
    /// Divide two u32 values (unsigned).
    DivU32,
    /// Divide two i64 values (signed).
    DivI64,
    /// Divide two u64 values (unsigned).
    DivU64,
    /// Divide two f32 values.
    DivF32,
    /// Divide two f64 values.
    DivF64,
    /// Remainder of two i32 values (signed).
    RemI32,
    /// Remainder of two u32 values (unsigned).
    RemU32,
    /// Remainder of two i64 values (signed).
    RemI64,
    /// Remainder of two u64 values (unsigned).
    RemU64,
    /// Remainder of two f32 values.
    RemF32,
    /// Remainder of two f64 values.
    RemF64,
    /// Negate an i32 value.
    NegI32,
    /// Negate an i64 value.
    NegI64,
    /// Negate an f32 value.
    NegF32,
    /// Negate an f64 value.
    NegF64,

    // =========================================================================
    // Bitwise
    // =========================================================================
    /// Bitwise AND of two i32 values.
    AndI32,
    /// Bitwise AND of two i64 values.
    AndI64,
    /// Bitwise OR of two i32 values.
    OrI32,
    /// Bitwise OR of two i64 values.
    OrI64,
    /// Bitwise XOR of two i32 values.
    XorI32,
    /// Bitwise XOR of two i64 values.
    XorI64,
    /// Shift an i32 left; amount in the low bits of the second operand.
    ShlI32,
    /// Shift an i64 left; amount in the low bits of the second operand.
    ShlI64,
    /// Arithmetic shift an i32 right.
    ShrI32,
    /// Arithmetic shift an i64 right.
    ShrI64,
    /// Logical shift a u32 right.
    UshrI32,
    /// Logical shift a u64 right.
    UshrI64,
    /// Logical not: 0 becomes 1, anything else becomes 0.
    Not,

    // =========================================================================
    // Comparisons
    // =========================================================================
    /// Compare two i32 values for equality.
    EqI32,
    /// Compare two i64 values for equality.
    EqI64,
    /// Compare two f32 values for equality.
    EqF32,
    /// Compare two f64 values for equality.
    EqF64,
    /// Compare two i32 values for inequality.
    NeI32,
    /// Compare two i64 values for inequality.
    NeI64,
    /// Compare two f32 values for inequality (ordered).
    NeF32,
    /// Compare two f64 values for inequality (ordered).
    NeF64,
    /// Signed less-than on i32.
    LtI32,
    /// Unsigned less-than on u32.
    LtU32,
    /// Signed less-than on i64.
    LtI64,
    /// Unsigned less-than on u64.
    LtU64,
    /// Less-than on f32.
    LtF32,
    /// Less-than on f64.
    LtF64,
    /// Signed less-or-equal on i32.
    LeI32,
    /// Unsigned less-or-equal on u32.
    LeU32,
    /// Signed less-or-equal on i64.
    LeI64,
    /// Unsigned less-or-equal on u64.
    LeU64,
    /// Less-or-equal on f32.
    LeF32,
    /// Less-or-equal on f64.
    LeF64,
    /// Signed greater-than on i32.
    GtI32,
    /// Unsigned greater-than on u32.
    GtU32,
    /// Signed greater-than on i64.
    GtI64,
    /// Unsigned greater-than on u64.
    GtU64,
    /// Greater-than on f32.
    GtF32,
    /// Greater-than on f64.
    GtF64,
    /// Signed greater-or-equal on i32.
    GeI32,
    /// Unsigned greater-or-equal on u32.
    GeU32,
    /// Signed greater-or-equal on i64.
    GeI64,
    /// Unsigned greater-or-equal on u64.
    GeU64,
    /// Greater-or-equal on f32.
    GeF32,
    /// Greater-or-equal on f64.
    GeF64,

    // =========================================================================
    // Fused Compare-and-Branch
    // =========================================================================
    /// Branch forward if two i32 values are equal.
    /// Operand: u16 forward distance (big-endian)
    BrEqI32,
    /// Branch forward if two i64 values are equal.
    /// Operand: u16 forward distance (big-endian)
    BrEqI64,
    /// Branch forward if two f32 values are equal.
    /// Operand: u16 forward distance (big-endian)
    BrEqF32,
    /// Branch forward if two f64 values are equal.
    /// Operand: u16 forward distance (big-endian)
    BrEqF64,
    /// Branch forward if two i32 values differ.
    /// Operand: u16 forward distance (big-endian)
    BrNeI32,
    /// Branch forward if two i64 values differ.
    /// Operand: u16 forward distance (big-endian)
    BrNeI64,
    /// Branch forward if two f32 values differ (ordered).
    /// Operand: u16 forward distance (big-endian)
    BrNeF32,
    /// Branch forward if two f64 values differ (ordered).
    /// Operand: u16 forward distance (big-endian)
    BrNeF64,
    /// Branch forward on signed i32 less-than.
    /// Operand: u16 forward distance (big-endian)
    BrLtI32,
    /// Branch forward on unsigned u32 less-than.
    /// Operand: u16 forward distance (big-endian)
    BrLtU32,
    /// Branch forward on signed i64 less-than.
    /// Operand: u16 forward distance (big-endian)
    BrLtI64,
    /// Branch forward on unsigned u64 less-than.
    /// Operand: u16 forward distance (big-endian)
    BrLtU64,
    /// Branch forward on f32 less-than.
    /// Operand: u16 forward distance (big-endian)
    BrLtF32,
    /// Branch forward on f64 less-than.
    /// Operand: u16 forward distance (big-endian)
    BrLtF64,
    /// Branch forward on signed i32 less-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrLeI32,
    /// Branch forward on unsigned u32 less-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrLeU32,
    /// Branch forward on signed i64 less-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrLeI64,
    /// Branch forward on unsigned u64 less-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrLeU64,
    /// Branch forward on f32 less-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrLeF32,
    /// Branch forward on f64 less-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrLeF64,
    /// Branch forward on signed i32 greater-than.
    /// Operand: u16 forward distance (big-endian)
    BrGtI32,
    /// Branch forward on unsigned u32 greater-than.
    /// Operand: u16 forward distance (big-endian)
    BrGtU32,
    /// Branch forward on signed i64 greater-than.
    /// Operand: u16 forward distance (big-endian)
    BrGtI64,
    /// Branch forward on unsigned u64 greater-than.
    /// Operand: u16 forward distance (big-endian)
    BrGtU64,
    /// Branch forward on f32 greater-than.
    /// Operand: u16 forward distance (big-endian)
    BrGtF32,
    /// Branch forward on f64 greater-than.
    /// Operand: u16 forward distance (big-endian)
    BrGtF64,
    /// Branch forward on signed i32 greater-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrGeI32,
    /// Branch forward on unsigned u32 greater-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrGeU32,
    /// Branch forward on signed i64 greater-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrGeI64,
    /// Branch forward on unsigned u64 greater-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrGeU64,
    /// Branch forward on f32 greater-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrGeF32,
    /// Branch forward on f64 greater-or-equal.
    /// Operand: u16 forward distance (big-endian)
    BrGeF64,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Unconditional forward jump.
    /// Operand: u16 forward distance (big-endian)
    Jump,
    /// Pop an i32; jump forward if it is non-zero.
    /// Operand: u16 forward distance (big-endian)
    JumpIfTrue,
    /// Pop an i32; jump forward if it is zero.
    /// Operand: u16 forward distance (big-endian)
    JumpIfFalse,
    /// Unconditional backward jump.
    /// Operand: u16 backward distance (big-endian)
    Loop,
    /// Pop a u64 selector and jump through a table of forward distances.
    /// Operand: u16 entry count (big-endian), then count u16 forward
    /// distances, each measured from the end of its own entry. A selector
    /// at or past the count falls through to the code after the table.
    JumpTable,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Call a method by index; arguments are on the stack left to right.
    /// Operands: u16 method index, u16 call-site signature index
    Call,
    /// Call an imported host builtin.
    /// Operand: u16 host import index (big-endian)
    CallHost,
    /// Pop a function token and call it; arguments are below the token.
    /// Operand: u16 call-site signature index (big-endian)
    CallIndirect,
    /// Push an opaque callable token for a method.
    /// Operand: u16 method index (big-endian)
    FuncPtr,
    /// Return the top of stack to the caller.
    Return,
    /// Return with no value.
    ReturnVoid,

    // =========================================================================
    // Memory
    // =========================================================================
    /// Pop an address; push the i8 at it, sign-extended.
    LoadIndI8,
    /// Pop an address; push the u8 at it, zero-extended.
    LoadIndU8,
    /// Pop an address; push the i16 at it, sign-extended.
    LoadIndI16,
    /// Pop an address; push the u16 at it, zero-extended.
    LoadIndU16,
    /// Pop an address; push the i32 at it.
    LoadIndI32,
    /// Pop an address; push the i64 at it.
    LoadIndI64,
    /// Pop an address; push the f32 at it.
    LoadIndF32,
    /// Pop an address; push the f64 at it.
    LoadIndF64,
    /// Pop an address; push the pointer at it.
    LoadIndPtr,
    /// Pop a value then an address; store the value's low byte.
    StoreIndI8,
    /// Pop a value then an address; store the value's low 16 bits.
    StoreIndI16,
    /// Pop a value then an address; store the value's low 32 bits.
    StoreIndI32,
    /// Pop a value then an address; store all 64 bits.
    StoreIndI64,
    /// Pop an f32 then an address; store it.
    StoreIndF32,
    /// Pop an f64 then an address; store it.
    StoreIndF64,
    /// Pop a pointer then an address; store it.
    StoreIndPtr,
    /// Pop count, source, destination; copy count bytes. Overlapping
    /// regions copy as if through a temporary.
    MemCopy,
    /// Pop length, byte value, destination; fill length bytes.
    MemFill,
    /// Pop a u64 byte size; push the address of that much fresh
    /// frame-local storage, released on return.
    StackAlloc,

    // =========================================================================
    // Conversions
    // =========================================================================
    /// Re-narrow an i32 slot to i8, sign-extending back into the slot.
    ConvI32I8,
    /// Re-narrow an i32 slot to u8, zero-extending back into the slot.
    ConvI32U8,
    /// Re-narrow an i32 slot to i16, sign-extending back into the slot.
    ConvI32I16,
    /// Re-narrow an i32 slot to u16, zero-extending back into the slot.
    ConvI32U16,
    /// Sign-extend an i32 to i64.
    ConvI32I64,
    /// Zero-extend a u32 to i64.
    ConvU32I64,
    /// Truncate an i64 to i32.
    ConvI64I32,
    /// Convert an i32 to f32.
    ConvI32F32,
    /// Convert an i32 to f64.
    ConvI32F64,
    /// Convert a u32 to f32.
    ConvU32F32,
    /// Convert a u32 to f64.
    ConvU32F64,
    /// Convert an i64 to f32.
    ConvI64F32,
    /// Convert an i64 to f64.
    ConvI64F64,
    /// Convert a u64 to f32.
    ConvU64F32,
    /// Convert a u64 to f64.
    ConvU64F64,
    /// Convert an f32 to i32, truncating toward zero.
    ConvF32I32,
    /// Convert an f32 to i64, truncating toward zero.
    ConvF32I64,
    /// Convert an f32 to u32, truncating toward zero.
    ConvF32U32,
    /// Convert an f32 to u64, truncating toward zero.
    ConvF32U64,
    /// Convert an f64 to i32, truncating toward zero.
    ConvF64I32,
    /// Convert an f64 to i64, truncating toward zero.
    ConvF64I64,
    /// Convert an f64 to u32, truncating toward zero.
    ConvF64U32,
    /// Convert an f64 to u64, truncating toward zero.
    ConvF64U64,
    /// Widen an f32 to f64.
    ConvF32F64,
    /// Narrow an f64 to f32.
    ConvF64F32,
    /// Reinterpret i32 bits as f32.
    BitcastI32F32,
    /// Reinterpret f32 bits as i32.
    BitcastF32I32,
    /// Reinterpret i64 bits as f64.
    BitcastI64F64,
    /// Reinterpret f64 bits as i64.
    BitcastF64I64,

    // =========================================================================
    // Traps
    // =========================================================================
    /// Abort execution; reaching this opcode is a runtime fault.
    Fault,
}

impl OpCode {
    /// Convert from u8, returning None for invalid values.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Get the size of operands for this opcode in bytes.
    ///
    /// This does NOT include the opcode byte itself. `JumpTable` reports
    /// only its fixed count operand; the count u16 table entries follow.
    pub fn operand_size(&self) -> usize {
        match self {
            // No operands (1 byte total)
            OpCode::PushZero
            | OpCode::PushOne
            | OpCode::PushNull
            | OpCode::Dup
            | OpCode::Pop
            | OpCode::AddI32
            | OpCode::AddI64
            | OpCode::AddF32
            | OpCode::AddF64
            | OpCode::SubI32
            | OpCode::SubI64
            | OpCode::SubF32
            | OpCode::SubF64
            | OpCode::MulI32
            | OpCode::MulI64
            | OpCode::MulF32
            | OpCode::MulF64
            | OpCode::DivI32
            | OpCode::DivU32
            | OpCode::DivI64
            | OpCode::DivU64
            | OpCode::DivF32
            | OpCode::DivF64
            | OpCode::RemI32
            | OpCode::RemU32
            | OpCode::RemI64
            | OpCode::RemU64
            | OpCode::RemF32
            | OpCode::RemF64
            | OpCode::NegI32
            | OpCode::NegI64
            | OpCode::NegF32
            | OpCode::NegF64
            | OpCode::AndI32
            | OpCode::AndI64
            | OpCode::OrI32
            | OpCode::OrI64
            | OpCode::XorI32
            | OpCode::XorI64
            | OpCode::ShlI32
            | OpCode::ShlI64
            | OpCode::ShrI32
            | OpCode::ShrI64
            | OpCode::UshrI32
            | OpCode::UshrI64
            | OpCode::Not
            | OpCode::EqI32
            | OpCode::EqI64
            | OpCode::EqF32
            | OpCode::EqF64
            | OpCode::NeI32
            | OpCode::NeI64
            | OpCode::NeF32
            | OpCode::NeF64
            | OpCode::LtI32
            | OpCode::LtU32
            | OpCode::LtI64
            | OpCode::LtU64
            | OpCode::LtF32
            | OpCode::LtF64
            | OpCode::LeI32
            | OpCode::LeU32
            | OpCode::LeI64
            | OpCode::LeU64
            | OpCode::LeF32
            | OpCode::LeF64
            | OpCode::GtI32
            | OpCode::GtU32
            | OpCode::GtI64
            | OpCode::GtU64
            | OpCode::GtF32
            | OpCode::GtF64
            | OpCode::GeI32
            | OpCode::GeU32
            | OpCode::GeI64
            | OpCode::GeU64
            | OpCode::GeF32
            | OpCode::GeF64
            | OpCode::Return
            | OpCode::ReturnVoid
            | OpCode::LoadIndI8
            | OpCode::LoadIndU8
            | OpCode::LoadIndI16
            | OpCode::LoadIndU16
            | OpCode::LoadIndI32
            | OpCode::LoadIndI64
            | OpCode::LoadIndF32
            | OpCode::LoadIndF64
            | OpCode::LoadIndPtr
            | OpCode::StoreIndI8
            | OpCode::StoreIndI16
            | OpCode::StoreIndI32
            | OpCode::StoreIndI64
            | OpCode::StoreIndF32
            | OpCode::StoreIndF64
            | OpCode::StoreIndPtr
            | OpCode::MemCopy
            | OpCode::MemFill
            | OpCode::StackAlloc
            | OpCode::ConvI32I8
            | OpCode::ConvI32U8
            | OpCode::ConvI32I16
            | OpCode::ConvI32U16
            | OpCode::ConvI32I64
            | OpCode::ConvU32I64
            | OpCode::ConvI64I32
            | OpCode::ConvI32F32
            | OpCode::ConvI32F64
            | OpCode::ConvU32F32
            | OpCode::ConvU32F64
            | OpCode::ConvI64F32
            | OpCode::ConvI64F64
            | OpCode::ConvU64F32
            | OpCode::ConvU64F64
            | OpCode::ConvF32I32
            | OpCode::ConvF32I64
            | OpCode::ConvF32U32
            | OpCode::ConvF32U64
            | OpCode::ConvF64I32
            | OpCode::ConvF64I64
            | OpCode::ConvF64U32
            | OpCode::ConvF64U64
            | OpCode::ConvF32F64
            | OpCode::ConvF64F32
            | OpCode::BitcastI32F32
            | OpCode::BitcastF32I32
            | OpCode::BitcastI64F64
            | OpCode::BitcastF64I64
            | OpCode::Fault => 0,

            // 1-byte operand (2 bytes total)
            OpCode::Constant | OpCode::GetLocal | OpCode::SetLocal | OpCode::LocalAddr => 1,

            // 2-byte operand (3 bytes total)
            OpCode::ConstantWide
            | OpCode::GetLocalWide
            | OpCode::SetLocalWide
            | OpCode::LocalAddrWide
            | OpCode::GlobalAddr
            | OpCode::BrEqI32
            | OpCode::BrEqI64
            | OpCode::BrEqF32
            | OpCode::BrEqF64
            | OpCode::BrNeI32
            | OpCode::BrNeI64
            | OpCode::BrNeF32
            | OpCode::BrNeF64
            | OpCode::BrLtI32
            | OpCode::BrLtU32
            | OpCode::BrLtI64
            | OpCode::BrLtU64
            | OpCode::BrLtF32
            | OpCode::BrLtF64
            | OpCode::BrLeI32
            | OpCode::BrLeU32
            | OpCode::BrLeI64
            | OpCode::BrLeU64
            | OpCode::BrLeF32
            | OpCode::BrLeF64
            | OpCode::BrGtI32
            | OpCode::BrGtU32
            | OpCode::BrGtI64
            | OpCode::BrGtU64
            | OpCode::BrGtF32
            | OpCode::BrGtF64
            | OpCode::BrGeI32
            | OpCode::BrGeU32
            | OpCode::BrGeI64
            | OpCode::BrGeU64
            | OpCode::BrGeF32
            | OpCode::BrGeF64
            | OpCode::Jump
            | OpCode::JumpIfTrue
            | OpCode::JumpIfFalse
            | OpCode::Loop
            | OpCode::JumpTable
            | OpCode::CallHost
            | OpCode::CallIndirect
            | OpCode::FuncPtr => 2,

            // 4-byte operand (5 bytes total)
            OpCode::Call => 4,
        }
    }

    /// Get the human-readable name of this opcode.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantWide => "CONSTANT_WIDE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::Dup => "DUP",
            OpCode::Pop => "POP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::LocalAddr => "LOCAL_ADDR",
            OpCode::GetLocalWide => "GET_LOCAL_WIDE",
            OpCode::SetLocalWide => "SET_LOCAL_WIDE",
            OpCode::LocalAddrWide => "LOCAL_ADDR_WIDE",
            OpCode::GlobalAddr => "GLOBAL_ADDR",
            OpCode::AddI32 => "ADD_I32",
            OpCode::AddI64 => "ADD_I64",
            OpCode::AddF32 => "ADD_F32",
            OpCode::AddF64 => "ADD_F64",
            OpCode::SubI32 => "SUB_I32",
            OpCode::SubI64 => "SUB_I64",
            OpCode::SubF32 => "SUB_F32",
            OpCode::SubF64 => "SUB_F64",
            OpCode::MulI32 => "MUL_I32",
            OpCode::MulI64 => "MUL_I64",
            OpCode::MulF32 => "MUL_F32",
            OpCode::MulF64 => "MUL_F64",
            OpCode::DivI32 => "DIV_I32",
            OpCode::DivU32 => "DIV_U32",
            OpCode::DivI64 => "DIV_I64",
            OpCode::DivU64 => "DIV_U64",
            OpCode::DivF32 => "DIV_F32",
            OpCode::DivF64 => "DIV_F64",
            OpCode::RemI32 => "REM_I32",
            OpCode::RemU32 => "REM_U32",
            OpCode::RemI64 => "REM_I64",
            OpCode::RemU64 => "REM_U64",
            OpCode::RemF32 => "REM_F32",
            OpCode::RemF64 => "REM_F64",
            OpCode::NegI32 => "NEG_I32",
            OpCode::NegI64 => "NEG_I64",
            OpCode::NegF32 => "NEG_F32",
            OpCode::NegF64 => "NEG_F64",
            OpCode::AndI32 => "AND_I32",
            OpCode::AndI64 => "AND_I64",
            OpCode::OrI32 => "OR_I32",
            OpCode::OrI64 => "OR_I64",
            OpCode::XorI32 => "XOR_I32",
            OpCode::XorI64 => "XOR_I64",
            OpCode::ShlI32 => "SHL_I32",
            OpCode::ShlI64 => "SHL_I64",
            OpCode::ShrI32 => "SHR_I32",
            OpCode::ShrI64 => "SHR_I64",
            OpCode::UshrI32 => "USHR_I32",
            OpCode::UshrI64 => "USHR_I64",
            OpCode::Not => "NOT",
            OpCode::EqI32 => "EQ_I32",
            OpCode::EqI64 => "EQ_I64",
            OpCode::EqF32 => "EQ_F32",
            OpCode::EqF64 => "EQ_F64",
            OpCode::NeI32 => "NE_I32",
            OpCode::NeI64 => "NE_I64",
            OpCode::NeF32 => "NE_F32",
            OpCode::NeF64 => "NE_F64",
            OpCode::LtI32 => "LT_I32",
            OpCode::LtU32 => "LT_U32",
            OpCode::LtI64 => "LT_I64",
            OpCode::LtU64 => "LT_U64",
            OpCode::LtF32 => "LT_F32",
            OpCode::LtF64 => "LT_F64",
            OpCode::LeI32 => "LE_I32",
            OpCode::LeU32 => "LE_U32",
            OpCode::LeI64 => "LE_I64",
            OpCode::LeU64 => "LE_U64",
            OpCode::LeF32 => "LE_F32",
            OpCode::LeF64 => "LE_F64",
            OpCode::GtI32 => "GT_I32",
            OpCode::GtU32 => "GT_U32",
            OpCode::GtI64 => "GT_I64",
            OpCode::GtU64 => "GT_U64",
            OpCode::GtF32 => "GT_F32",
            OpCode::GtF64 => "GT_F64",
            OpCode::GeI32 => "GE_I32",
            OpCode::GeU32 => "GE_U32",
            OpCode::GeI64 => "GE_I64",
            OpCode::GeU64 => "GE_U64",
            OpCode::GeF32 => "GE_F32",
            OpCode::GeF64 => "GE_F64",
            OpCode::BrEqI32 => "BR_EQ_I32",
            OpCode::BrEqI64 => "BR_EQ_I64",
            OpCode::BrEqF32 => "BR_EQ_F32",
            OpCode::BrEqF64 => "BR_EQ_F64",
            OpCode::BrNeI32 => "BR_NE_I32",
            OpCode::BrNeI64 => "BR_NE_I64",
            OpCode::BrNeF32 => "BR_NE_F32",
            OpCode::BrNeF64 => "BR_NE_F64",
            OpCode::BrLtI32 => "BR_LT_I32",
            OpCode::BrLtU32 => "BR_LT_U32",
            OpCode::BrLtI64 => "BR_LT_I64",
            OpCode::BrLtU64 => "BR_LT_U64",
            OpCode::BrLtF32 => "BR_LT_F32",
            OpCode::BrLtF64 => "BR_LT_F64",
            OpCode::BrLeI32 => "BR_LE_I32",
            OpCode::BrLeU32 => "BR_LE_U32",
            OpCode::BrLeI64 => "BR_LE_I64",
            OpCode::BrLeU64 => "BR_LE_U64",
            OpCode::BrLeF32 => "BR_LE_F32",
            OpCode::BrLeF64 => "BR_LE_F64",
            OpCode::BrGtI32 => "BR_GT_I32",
            OpCode::BrGtU32 => "BR_GT_U32",
            OpCode::BrGtI64 => "BR_GT_I64",
            OpCode::BrGtU64 => "BR_GT_U64",
            OpCode::BrGtF32 => "BR_GT_F32",
            OpCode::BrGtF64 => "BR_GT_F64",
            OpCode::BrGeI32 => "BR_GE_I32",
            OpCode::BrGeU32 => "BR_GE_U32",
            OpCode::BrGeI64 => "BR_GE_I64",
            OpCode::BrGeU64 => "BR_GE_U64",
            OpCode::BrGeF32 => "BR_GE_F32",
            OpCode::BrGeF64 => "BR_GE_F64",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::Loop => "LOOP",
            OpCode::JumpTable => "JUMP_TABLE",
            OpCode::Call => "CALL",
            OpCode::CallHost => "CALL_HOST",
            OpCode::CallIndirect => "CALL_INDIRECT",
            OpCode::FuncPtr => "FUNC_PTR",
            OpCode::Return => "RETURN",
            OpCode::ReturnVoid => "RETURN_VOID",
            OpCode::LoadIndI8 => "LOAD_IND_I8",
            OpCode::LoadIndU8 => "LOAD_IND_U8",
            OpCode::LoadIndI16 => "LOAD_IND_I16",
            OpCode::LoadIndU16 => "LOAD_IND_U16",
            OpCode::LoadIndI32 => "LOAD_IND_I32",
            OpCode::LoadIndI64 => "LOAD_IND_I64",
            OpCode::LoadIndF32 => "LOAD_IND_F32",
            OpCode::LoadIndF64 => "LOAD_IND_F64",
            OpCode::LoadIndPtr => "LOAD_IND_PTR",
            OpCode::StoreIndI8 => "STORE_IND_I8",
            OpCode::StoreIndI16 => "STORE_IND_I16",
            OpCode::StoreIndI32 => "STORE_IND_I32",
            OpCode::StoreIndI64 => "STORE_IND_I64",
            OpCode::StoreIndF32 => "STORE_IND_F32",
            OpCode::StoreIndF64 => "STORE_IND_F64",
            OpCode::StoreIndPtr => "STORE_IND_PTR",
            OpCode::MemCopy => "MEM_COPY",
            OpCode::MemFill => "MEM_FILL",
            OpCode::StackAlloc => "STACK_ALLOC",
            OpCode::ConvI32I8 => "CONV_I32_I8",
            OpCode::ConvI32U8 => "CONV_I32_U8",
            OpCode::ConvI32I16 => "CONV_I32_I16",
            OpCode::ConvI32U16 => "CONV_I32_U16",
            OpCode::ConvI32I64 => "CONV_I32_I64",
            OpCode::ConvU32I64 => "CONV_U32_I64",
            OpCode::ConvI64I32 => "CONV_I64_I32",
            OpCode::ConvI32F32 => "CONV_I32_F32",
            OpCode::ConvI32F64 => "CONV_I32_F64",
            OpCode::ConvU32F32 => "CONV_U32_F32",
            OpCode::ConvU32F64 => "CONV_U32_F64",
            OpCode::ConvI64F32 => "CONV_I64_F32",
            OpCode::ConvI64F64 => "CONV_I64_F64",
            OpCode::ConvU64F32 => "CONV_U64_F32",
            OpCode::ConvU64F64 => "CONV_U64_F64",
            OpCode::ConvF32I32 => "CONV_F32_I32",
            OpCode::ConvF32I64 => "CONV_F32_I64",
            OpCode::ConvF32U32 => "CONV_F32_U32",
            OpCode::ConvF32U64 => "CONV_F32_U64",
            OpCode::ConvF64I32 => "CONV_F64_I32",
            OpCode::ConvF64I64 => "CONV_F64_I64",
            OpCode::ConvF64U32 => "CONV_F64_U32",
            OpCode::ConvF64U64 => "CONV_F64_U64",
            OpCode::ConvF32F64 => "CONV_F32_F64",
            OpCode::ConvF64F32 => "CONV_F64_F32",
            OpCode::BitcastI32F32 => "BITCAST_I32_F32",
            OpCode::BitcastF32I32 => "BITCAST_F32_I32",
            OpCode::BitcastI64F64 => "BITCAST_I64_F64",
            OpCode::BitcastF64I64 => "BITCAST_F64_I64",
            OpCode::Fault => "FAULT",
        }
    }
}
