//! Instructions and operands.
//!
//! Instruction behavior is a closed tagged union ([`InstKind`]): every
//! backend pass dispatches with one exhaustive `match`, and shapes the
//! backend cannot lower are reported by name instead of silently ignored.
//! Operands are [`ValueRef`]s — small copyable references into the
//! function's instruction list, the argument list, or the module pools.

use ssalower_core::SourceLoc;

use crate::ids::{BlockId, ConstId, FuncId, GlobalId, InstId};
use crate::types::{FnSig, IrType};

/// Reference to any value an instruction can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueRef {
    /// Result of an instruction in the same function.
    Inst(InstId),
    /// Function parameter by position.
    Arg(u32),
    /// Entry in the module constant pool.
    Const(ConstId),
    /// Address of a module global.
    Global(GlobalId),
    /// Address of a module function.
    Func(FuncId),
}

impl From<InstId> for ValueRef {
    fn from(id: InstId) -> Self {
        ValueRef::Inst(id)
    }
}

impl From<ConstId> for ValueRef {
    fn from(id: ConstId) -> Self {
        ValueRef::Const(id)
    }
}

impl From<GlobalId> for ValueRef {
    fn from(id: GlobalId) -> Self {
        ValueRef::Global(id)
    }
}

impl From<FuncId> for ValueRef {
    fn from(id: FuncId) -> Self {
        ValueRef::Func(id)
    }
}

/// The target of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee {
    /// Direct call to a module function.
    Func(FuncId),
    /// Indirect call through a computed function address.
    Value(ValueRef),
}

/// Two-operand arithmetic and bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinOp {
    /// The IR mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::UDiv => "udiv",
            BinOp::SRem => "srem",
            BinOp::URem => "urem",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::LShr => "lshr",
            BinOp::AShr => "ashr",
        }
    }

    /// Check if this operation works on floats.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem
        )
    }

    /// Check if this is a shift.
    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::LShr | BinOp::AShr)
    }
}

/// Scalar conversion operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvOp {
    Trunc,
    ZExt,
    SExt,
    FpTrunc,
    FpExt,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    PtrToInt,
    IntToPtr,
    Bitcast,
}

impl ConvOp {
    /// The IR mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            ConvOp::Trunc => "trunc",
            ConvOp::ZExt => "zext",
            ConvOp::SExt => "sext",
            ConvOp::FpTrunc => "fptrunc",
            ConvOp::FpExt => "fpext",
            ConvOp::FpToSi => "fptosi",
            ConvOp::FpToUi => "fptoui",
            ConvOp::SiToFp => "sitofp",
            ConvOp::UiToFp => "uitofp",
            ConvOp::PtrToInt => "ptrtoint",
            ConvOp::IntToPtr => "inttoptr",
            ConvOp::Bitcast => "bitcast",
        }
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl IntPredicate {
    /// The IR mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
        }
    }

    /// Check if operands are interpreted as signed.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntPredicate::Slt | IntPredicate::Sle | IntPredicate::Sgt | IntPredicate::Sge
        )
    }
}

/// Float comparison predicates.
///
/// `O*` predicates are *ordered*: false when either operand is NaN. `U*`
/// predicates are *unordered*: true when either operand is NaN. The
/// always-ordered/always-unordered and constant predicates are not part of
/// the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
    Ueq,
    Une,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl FloatPredicate {
    /// The IR mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
            FloatPredicate::Ueq => "ueq",
            FloatPredicate::Une => "une",
            FloatPredicate::Ult => "ult",
            FloatPredicate::Ule => "ule",
            FloatPredicate::Ugt => "ugt",
            FloatPredicate::Uge => "uge",
        }
    }

    /// Check if this predicate is ordered (false on NaN).
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            FloatPredicate::Oeq
                | FloatPredicate::One
                | FloatPredicate::Olt
                | FloatPredicate::Ole
                | FloatPredicate::Ogt
                | FloatPredicate::Oge
        )
    }

    /// Express this predicate as an ordered compare plus an optional
    /// negation.
    ///
    /// Ordered predicates return themselves unnegated. Unordered predicates
    /// return the ordered complement with `negate = true`: for example
    /// `ult(a, b)` holds exactly when `!oge(a, b)`, because the complement
    /// of "unordered or less-than" over floats is "ordered and
    /// greater-or-equal".
    pub fn as_ordered(self) -> (FloatPredicate, bool) {
        match self {
            FloatPredicate::Oeq
            | FloatPredicate::One
            | FloatPredicate::Olt
            | FloatPredicate::Ole
            | FloatPredicate::Ogt
            | FloatPredicate::Oge => (self, false),
            FloatPredicate::Ueq => (FloatPredicate::One, true),
            FloatPredicate::Une => (FloatPredicate::Oeq, true),
            FloatPredicate::Ult => (FloatPredicate::Oge, true),
            FloatPredicate::Ule => (FloatPredicate::Ogt, true),
            FloatPredicate::Ugt => (FloatPredicate::Ole, true),
            FloatPredicate::Uge => (FloatPredicate::Olt, true),
        }
    }
}

/// The behavior of one instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    /// Two-operand arithmetic or bitwise operation.
    Binary {
        op: BinOp,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    /// Integer or pointer comparison producing `i1`.
    ICmp {
        pred: IntPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    /// Float comparison producing `i1`.
    FCmp {
        pred: FloatPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    /// Float negation.
    FNeg { operand: ValueRef },
    /// Stack allocation of `count` elements of `allocated`. The result is
    /// the address of the storage.
    Alloca { allocated: IrType, count: ValueRef },
    /// Read through a pointer. The instruction type is the loaded type.
    Load { ptr: ValueRef },
    /// Write through a pointer.
    Store { value: ValueRef, ptr: ValueRef },
    /// Address computation: walk `source_ty` by `indices` starting at
    /// `base`. The first index scales by the size of `source_ty` itself.
    Gep {
        base: ValueRef,
        source_ty: IrType,
        indices: Vec<ValueRef>,
    },
    /// SSA merge point. One incoming value per predecessor edge.
    Phi { incomings: Vec<(BlockId, ValueRef)> },
    /// Function call. `sig` is the call-site signature, which for variadic
    /// callees includes the variadic arguments of this particular site.
    Call {
        callee: Callee,
        sig: FnSig,
        args: Vec<ValueRef>,
    },
    /// Choose between two values without branching in the IR.
    Select {
        cond: ValueRef,
        if_true: ValueRef,
        if_false: ValueRef,
    },
    /// Scalar conversion.
    Convert { op: ConvOp, operand: ValueRef },
    /// Stop undef/poison propagation. Lowered as the operand value.
    Freeze { operand: ValueRef },
    /// Read one lane of a vector.
    ExtractElement { vector: ValueRef, index: ValueRef },
    /// Replace one lane of a vector.
    InsertElement {
        vector: ValueRef,
        elem: ValueRef,
        index: ValueRef,
    },
    /// Build a vector by picking lanes from the concatenation of `a` and
    /// `b` according to `mask`.
    ShuffleVector {
        a: ValueRef,
        b: ValueRef,
        mask: Vec<u32>,
    },
    /// Return, with a value unless the function returns void.
    Ret { value: Option<ValueRef> },
    /// Unconditional branch.
    Br { target: BlockId },
    /// Two-way branch on an `i1` condition.
    CondBr {
        cond: ValueRef,
        if_true: BlockId,
        if_false: BlockId,
    },
    /// Multi-way branch on an integer value.
    Switch {
        value: ValueRef,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    },
    /// Control never reaches here.
    Unreachable,
    /// An instruction the loader recognized but this backend cannot lower.
    /// Reaching one during emission is a hard error naming `opcode`.
    Unsupported { opcode: String },
}

impl InstKind {
    /// Check if this kind ends a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Ret { .. }
                | InstKind::Br { .. }
                | InstKind::CondBr { .. }
                | InstKind::Switch { .. }
                | InstKind::Unreachable
        )
    }

    /// Check if this is a phi node.
    pub fn is_phi(&self) -> bool {
        matches!(self, InstKind::Phi { .. })
    }
}

/// One instruction: behavior, result type, and optional debug metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// What the instruction does.
    pub kind: InstKind,
    /// The result type. `Void` when the instruction produces no value.
    pub ty: IrType,
    /// Source position, when the producer recorded one.
    pub loc: Option<SourceLoc>,
    /// Source-level variable name, when the producer recorded one.
    pub name: Option<String>,
}

impl Instruction {
    /// The IR mnemonic, used in diagnostics.
    pub fn opcode(&self) -> &str {
        match &self.kind {
            InstKind::Binary { op, .. } => op.name(),
            InstKind::ICmp { .. } => "icmp",
            InstKind::FCmp { .. } => "fcmp",
            InstKind::FNeg { .. } => "fneg",
            InstKind::Alloca { .. } => "alloca",
            InstKind::Load { .. } => "load",
            InstKind::Store { .. } => "store",
            InstKind::Gep { .. } => "getelementptr",
            InstKind::Phi { .. } => "phi",
            InstKind::Call { .. } => "call",
            InstKind::Select { .. } => "select",
            InstKind::Convert { op, .. } => op.name(),
            InstKind::Freeze { .. } => "freeze",
            InstKind::ExtractElement { .. } => "extractelement",
            InstKind::InsertElement { .. } => "insertelement",
            InstKind::ShuffleVector { .. } => "shufflevector",
            InstKind::Ret { .. } => "ret",
            InstKind::Br { .. } | InstKind::CondBr { .. } => "br",
            InstKind::Switch { .. } => "switch",
            InstKind::Unreachable => "unreachable",
            InstKind::Unsupported { opcode } => opcode,
        }
    }

    /// Check if this instruction ends a basic block.
    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    /// Check if this instruction produces a value.
    pub fn has_result(&self) -> bool {
        !self.ty.is_void() && !self.kind.is_terminator()
    }

    /// Visit every value operand, in evaluation order.
    pub fn for_each_operand(&self, mut f: impl FnMut(ValueRef)) {
        match &self.kind {
            InstKind::Binary { lhs, rhs, .. }
            | InstKind::ICmp { lhs, rhs, .. }
            | InstKind::FCmp { lhs, rhs, .. } => {
                f(*lhs);
                f(*rhs);
            }
            InstKind::FNeg { operand }
            | InstKind::Convert { operand, .. }
            | InstKind::Freeze { operand } => f(*operand),
            InstKind::Alloca { count, .. } => f(*count),
            InstKind::Load { ptr } => f(*ptr),
            InstKind::Store { value, ptr } => {
                f(*value);
                f(*ptr);
            }
            InstKind::Gep { base, indices, .. } => {
                f(*base);
                for index in indices {
                    f(*index);
                }
            }
            InstKind::Phi { incomings } => {
                for (_, value) in incomings {
                    f(*value);
                }
            }
            InstKind::Call { callee, args, .. } => {
                if let Callee::Value(value) = callee {
                    f(*value);
                }
                for arg in args {
                    f(*arg);
                }
            }
            InstKind::Select {
                cond,
                if_true,
                if_false,
            } => {
                f(*cond);
                f(*if_true);
                f(*if_false);
            }
            InstKind::ExtractElement { vector, index } => {
                f(*vector);
                f(*index);
            }
            InstKind::InsertElement {
                vector,
                elem,
                index,
            } => {
                f(*vector);
                f(*elem);
                f(*index);
            }
            InstKind::ShuffleVector { a, b, .. } => {
                f(*a);
                f(*b);
            }
            InstKind::Ret { value } => {
                if let Some(value) = value {
                    f(*value);
                }
            }
            InstKind::CondBr { cond, .. } => f(*cond),
            InstKind::Switch { value, .. } => f(*value),
            InstKind::Br { .. } | InstKind::Unreachable | InstKind::Unsupported { .. } => {}
        }
    }
}
