//! Identifiers for IR entities.
//!
//! Every entity in a module is referenced by a typed index: instructions and
//! blocks are scoped to their function, constants, globals, and functions to
//! the module. Ids are handed out by the builder and stay stable for the
//! lifetime of the module.

use std::fmt;

macro_rules! ir_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Get the raw index.
            pub const fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                $name(index)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<$name> for usize {
            fn from(id: $name) -> Self {
                id.0 as usize
            }
        }
    };
}

ir_id! {
    /// Identifier for an instruction result (an SSA value), scoped to its
    /// function.
    InstId, "v"
}

ir_id! {
    /// Identifier for a basic block, scoped to its function.
    BlockId, "bb"
}

ir_id! {
    /// Identifier for an entry in the module constant pool.
    ConstId, "c"
}

ir_id! {
    /// Identifier for a module global variable.
    GlobalId, "g"
}

ir_id! {
    /// Identifier for a module function (definition or declaration).
    FuncId, "f"
}
