//! In-memory SSA intermediate representation.
//!
//! This crate defines the input side of the lowering pipeline: a module of
//! globals, functions, basic blocks, and typed instructions in SSA form,
//! together with the declared data layout and a builder API for
//! constructing modules programmatically.
//!
//! Everything is id-indexed — instructions, blocks, constants, globals, and
//! functions are referenced through small copyable ids rather than
//! pointers, so the graph is plain data: cheap to clone, trivially
//! traversable, and free of interior mutability.
//!
//! The backend (`ssalower-compiler`) consumes a [`Module`] by shared
//! reference and never mutates it.

pub mod builder;
pub mod constant;
pub mod function;
pub mod ids;
pub mod inst;
pub mod layout;
pub mod module;
pub mod types;

pub use builder::{FunctionBuilder, ModuleBuilder};
pub use constant::Constant;
pub use function::{Block, Function, Param};
pub use ids::{BlockId, ConstId, FuncId, GlobalId, InstId};
pub use inst::{
    BinOp, Callee, ConvOp, FloatPredicate, InstKind, Instruction, IntPredicate, ValueRef,
};
pub use layout::{DataLayout, POINTER_SIZE, align_to};
pub use module::{Global, Module, SourceFile};
pub use types::{FnSig, IrType};
