//! Intrinsic call strategies.
//!
//! Intrinsics never become methods in the output module. Each recognized
//! family is handled one of three ways at the call site:
//!
//! - [`IntrinsicStrategy::Forward`]: becomes a host call. The host name is
//!   derived from the base name plus the operand shape, so `llvm.sqrt.f64`
//!   forwards to `math.sqrt.f64` and `llvm.sqrt.v4f32` to a vector host.
//! - [`IntrinsicStrategy::Custom`]: open-coded as a bytecode sequence.
//! - [`IntrinsicStrategy::NoOp`]: emits nothing. These carry optimizer or
//!   lifetime hints with no runtime behavior.
//!
//! An unrecognized `llvm.*` callee is reported as
//! [`CompileError::UnsupportedIntrinsic`](ssalower_core::CompileError), not
//! silently dropped.

use rustc_hash::FxHashMap;

/// How one intrinsic family is lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntrinsicStrategy {
    /// Forward to a runtime host routine with the given base name.
    Forward(&'static str),
    /// Open-coded bytecode sequence.
    Custom(CustomIntrinsic),
    /// No runtime behavior; emit nothing.
    NoOp,
}

/// The intrinsics with hand-written lowerings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CustomIntrinsic {
    /// `llvm.memcpy` and `llvm.memmove`; the copy primitive tolerates
    /// overlap, so both map to it.
    MemCpy,
    /// `llvm.memset`.
    MemSet,
    /// `llvm.usub.sat`.
    USubSat,
    /// `llvm.stacksave`; pairs with the no-op `llvm.stackrestore`, so the
    /// saved token is never consumed and null serves.
    StackSave,
    /// `llvm.va_start`; asks the runtime to seed the register save area.
    VaStart,
    /// `llvm.dbg.declare`; feeds the debug sink, emits no code.
    DbgDeclare,
}

/// Maps intrinsic name prefixes to their lowering strategy.
pub(crate) struct IntrinsicRegistry {
    table: FxHashMap<&'static str, IntrinsicStrategy>,
}

impl IntrinsicRegistry {
    pub(crate) fn new() -> Self {
        use CustomIntrinsic::*;
        use IntrinsicStrategy::*;

        let mut table = FxHashMap::default();
        let mut put = |key, strategy| {
            table.insert(key, strategy);
        };

        // Math forwards.
        put("llvm.sqrt", Forward("sqrt"));
        put("llvm.fabs", Forward("fabs"));
        put("llvm.ceil", Forward("ceil"));
        put("llvm.floor", Forward("floor"));
        put("llvm.trunc", Forward("trunc"));
        put("llvm.copysign", Forward("copysign"));
        put("llvm.fma", Forward("fma"));
        put("llvm.fmuladd", Forward("fma"));
        put("llvm.minnum", Forward("fmin"));
        put("llvm.maxnum", Forward("fmax"));
        put("llvm.smax", Forward("smax"));
        put("llvm.smin", Forward("smin"));
        put("llvm.umax", Forward("umax"));
        put("llvm.umin", Forward("umin"));
        put("llvm.abs", Forward("abs"));

        // Horizontal reductions.
        put("llvm.vector.reduce.add", Forward("reduce.add"));
        put("llvm.vector.reduce.mul", Forward("reduce.mul"));
        put("llvm.vector.reduce.and", Forward("reduce.and"));
        put("llvm.vector.reduce.or", Forward("reduce.or"));
        put("llvm.vector.reduce.xor", Forward("reduce.xor"));
        put("llvm.vector.reduce.smax", Forward("reduce.smax"));
        put("llvm.vector.reduce.smin", Forward("reduce.smin"));
        put("llvm.vector.reduce.umax", Forward("reduce.umax"));
        put("llvm.vector.reduce.umin", Forward("reduce.umin"));
        put("llvm.vector.reduce.fmax", Forward("reduce.fmax"));
        put("llvm.vector.reduce.fmin", Forward("reduce.fmin"));

        // Open-coded.
        put("llvm.memcpy", Custom(MemCpy));
        put("llvm.memmove", Custom(MemCpy));
        put("llvm.memset", Custom(MemSet));
        put("llvm.usub.sat", Custom(USubSat));
        put("llvm.stacksave", Custom(StackSave));
        put("llvm.va_start", Custom(VaStart));
        put("llvm.dbg.declare", Custom(DbgDeclare));

        // Hints with no runtime behavior.
        put("llvm.assume", NoOp);
        put("llvm.lifetime.start", NoOp);
        put("llvm.lifetime.end", NoOp);
        put("llvm.stackrestore", NoOp);
        put("llvm.dbg.value", NoOp);
        put("llvm.dbg.label", NoOp);
        put("llvm.experimental.noalias.scope.decl", NoOp);
        put("llvm.va_end", NoOp);
        put("llvm.donothing", NoOp);

        IntrinsicRegistry { table }
    }

    /// Find the strategy for a full intrinsic name. Type-mangled suffixes
    /// (`llvm.memcpy.p0.p0.i64`) are stripped one component at a time until
    /// a registered prefix matches.
    pub(crate) fn lookup(&self, name: &str) -> Option<IntrinsicStrategy> {
        let mut key = name;
        loop {
            if let Some(&strategy) = self.table.get(key) {
                return Some(strategy);
            }
            match key.rsplit_once('.') {
                Some((head, _)) if head != "llvm" => key = head,
                _ => return None,
            }
        }
    }

    /// True when a call to `name` cannot interfere with memory another
    /// instruction reads. Forwarded math is value-in value-out, no-ops and
    /// `dbg.declare` emit no code at all.
    pub(crate) fn is_pure(&self, name: &str) -> bool {
        matches!(
            self.lookup(name),
            Some(
                IntrinsicStrategy::Forward(_)
                    | IntrinsicStrategy::NoOp
                    | IntrinsicStrategy::Custom(CustomIntrinsic::DbgDeclare)
            )
        )
    }
}
