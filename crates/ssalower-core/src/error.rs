//! Unified error types for module lowering.
//!
//! Every failure during compilation falls into one of four categories:
//!
//! ```text
//! CompileError
//! ├── UnsupportedType        - type shape/width with no target mapping
//! ├── UnsupportedInstruction - opcode/operand shape with no lowering rule
//! ├── UnsupportedIntrinsic   - unregistered intrinsic name
//! └── MalformedIr            - violated structural invariant in the input
//! ```
//!
//! All four abort the whole module compile: the symbol table's completeness
//! is an invariant every function depends on, so there is no degraded or
//! partial output. Errors name the offending instruction, type, or
//! intrinsic, and carry the source location when the IR provides one.

use thiserror::Error;

use crate::SourceLoc;

/// Convenience alias used throughout the compiler.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors that abort a module compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A type shape or width has no mapping onto the target.
    #[error("unsupported type {ty}: {detail}")]
    UnsupportedType {
        /// Display form of the offending IR type.
        ty: String,
        /// What made the type unmappable.
        detail: String,
    },

    /// An instruction opcode or operand shape has no lowering rule.
    #[error("unsupported instruction '{opcode}' in function '{function}'{}", fmt_loc(.loc))]
    UnsupportedInstruction {
        /// The IR opcode name.
        opcode: String,
        /// The enclosing function.
        function: String,
        /// Source location, when the instruction carries one.
        loc: Option<SourceLoc>,
    },

    /// A call targets an intrinsic name with no registered strategy.
    #[error("unsupported intrinsic '{name}' in function '{function}'")]
    UnsupportedIntrinsic {
        /// The full intrinsic name as it appears in the IR.
        name: String,
        /// The enclosing function.
        function: String,
    },

    /// The input IR violates a structural invariant.
    #[error("malformed IR{}: {detail}{}", fmt_fn(.function), fmt_loc(.loc))]
    MalformedIr {
        /// What invariant was violated.
        detail: String,
        /// The enclosing function, when known.
        function: Option<String>,
        /// Source location, when available.
        loc: Option<SourceLoc>,
    },
}

fn fmt_loc(loc: &Option<SourceLoc>) -> String {
    match loc {
        Some(loc) => format!(" at {loc}"),
        None => String::new(),
    }
}

fn fmt_fn(function: &Option<String>) -> String {
    match function {
        Some(name) => format!(" in function '{name}'"),
        None => String::new(),
    }
}

impl CompileError {
    /// Create an unsupported-type error.
    pub fn unsupported_type(ty: impl Into<String>, detail: impl Into<String>) -> Self {
        CompileError::UnsupportedType {
            ty: ty.into(),
            detail: detail.into(),
        }
    }

    /// Create an unsupported-instruction error.
    pub fn unsupported_instruction(
        opcode: impl Into<String>,
        function: impl Into<String>,
        loc: Option<SourceLoc>,
    ) -> Self {
        CompileError::UnsupportedInstruction {
            opcode: opcode.into(),
            function: function.into(),
            loc,
        }
    }

    /// Create an unsupported-intrinsic error.
    pub fn unsupported_intrinsic(name: impl Into<String>, function: impl Into<String>) -> Self {
        CompileError::UnsupportedIntrinsic {
            name: name.into(),
            function: function.into(),
        }
    }

    /// Create a malformed-IR error without function context.
    pub fn malformed(detail: impl Into<String>) -> Self {
        CompileError::MalformedIr {
            detail: detail.into(),
            function: None,
            loc: None,
        }
    }

    /// Create a malformed-IR error inside a function.
    pub fn malformed_in(
        detail: impl Into<String>,
        function: impl Into<String>,
        loc: Option<SourceLoc>,
    ) -> Self {
        CompileError::MalformedIr {
            detail: detail.into(),
            function: Some(function.into()),
            loc,
        }
    }

    /// Get the source location attached to this error, if any.
    pub fn loc(&self) -> Option<SourceLoc> {
        match self {
            CompileError::UnsupportedType { .. } => None,
            CompileError::UnsupportedInstruction { loc, .. } => *loc,
            CompileError::UnsupportedIntrinsic { .. } => None,
            CompileError::MalformedIr { loc, .. } => *loc,
        }
    }

    /// Check if this is an unsupported-type error.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, CompileError::UnsupportedType { .. })
    }

    /// Check if this is an unsupported-instruction error.
    pub fn is_unsupported_instruction(&self) -> bool {
        matches!(self, CompileError::UnsupportedInstruction { .. })
    }

    /// Check if this is an unsupported-intrinsic error.
    pub fn is_unsupported_intrinsic(&self) -> bool {
        matches!(self, CompileError::UnsupportedIntrinsic { .. })
    }

    /// Check if this is a malformed-IR error.
    pub fn is_malformed(&self) -> bool {
        matches!(self, CompileError::MalformedIr { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileId;

    #[test]
    fn unsupported_type_display() {
        let err = CompileError::unsupported_type("i3", "integer width 3 has no mapping");
        assert_eq!(
            format!("{err}"),
            "unsupported type i3: integer width 3 has no mapping"
        );
    }

    #[test]
    fn unsupported_instruction_display_with_loc() {
        let loc = SourceLoc::new(FileId::new(0), 14, 3);
        let err = CompileError::unsupported_instruction("atomicrmw", "update", Some(loc));
        assert_eq!(
            format!("{err}"),
            "unsupported instruction 'atomicrmw' in function 'update' at 14:3"
        );
    }

    #[test]
    fn unsupported_instruction_display_without_loc() {
        let err = CompileError::unsupported_instruction("fence", "init", None);
        assert_eq!(
            format!("{err}"),
            "unsupported instruction 'fence' in function 'init'"
        );
    }

    #[test]
    fn unsupported_intrinsic_display() {
        let err = CompileError::unsupported_intrinsic("llvm.frobnicate.i32", "main");
        assert_eq!(
            format!("{err}"),
            "unsupported intrinsic 'llvm.frobnicate.i32' in function 'main'"
        );
    }

    #[test]
    fn malformed_display() {
        let err = CompileError::malformed("global g referenced before declaration");
        assert_eq!(
            format!("{err}"),
            "malformed IR: global g referenced before declaration"
        );
    }

    #[test]
    fn malformed_in_function_display() {
        let loc = SourceLoc::new(FileId::new(1), 7, 1);
        let err = CompileError::malformed_in("phi has no incoming for predecessor", "loop", Some(loc));
        assert_eq!(
            format!("{err}"),
            "malformed IR in function 'loop': phi has no incoming for predecessor at 7:1"
        );
    }

    #[test]
    fn loc_accessor() {
        let loc = SourceLoc::new(FileId::new(0), 3, 9);
        let err = CompileError::unsupported_instruction("indirectbr", "f", Some(loc));
        assert_eq!(err.loc(), Some(loc));

        let err = CompileError::unsupported_type("x", "y");
        assert_eq!(err.loc(), None);
    }

    #[test]
    fn category_predicates() {
        assert!(CompileError::unsupported_type("t", "d").is_unsupported_type());
        assert!(CompileError::unsupported_instruction("op", "f", None).is_unsupported_instruction());
        assert!(CompileError::unsupported_intrinsic("n", "f").is_unsupported_intrinsic());
        assert!(CompileError::malformed("d").is_malformed());
        assert!(!CompileError::malformed("d").is_unsupported_type());
    }
}
