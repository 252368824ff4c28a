//! SSA-to-bytecode lowering toolchain.
//!
//! This crate ties the workspace together for embedders:
//!
//! - [`ir`] re-exports `ssalower-ir`: the in-memory SSA module model and
//!   the [`ModuleBuilder`](ir::ModuleBuilder) API for constructing one.
//! - [`compiler`] re-exports `ssalower-compiler`: the two-pass lowering
//!   backend producing a [`TargetModule`](compiler::TargetModule).
//! - The shared foundation types from `ssalower-core` (errors, handles,
//!   the [`DebugSink`] boundary) surface at the crate root.
//!
//! Most users only need the [`prelude`].
//!
//! # Example
//!
//! ```
//! use ssalower::prelude::*;
//!
//! let mut builder = ModuleBuilder::new("demo");
//! let mut f = builder.define_function(
//!     "double",
//!     FnSig::new(vec![IrType::I32], IrType::I32),
//! );
//! f.block();
//! let sum = f.binary(BinOp::Add, ValueRef::Arg(0), ValueRef::Arg(0), IrType::I32);
//! f.ret(sum);
//! let module = builder.finish();
//!
//! let result = compile_module(&module, &CompileOptions::default(), &mut NullDebugSink)?;
//! assert_eq!(result.target.methods.len(), 1);
//! # Ok::<(), ssalower::CompileError>(())
//! ```

pub use ssalower_compiler as compiler;
pub use ssalower_ir as ir;

pub use ssalower_core::{
    CompileError, DebugSink, DocId, FieldHandle, FileId, HostId, MethodHandle, NullDebugSink,
    Result, SigHandle, SourceLoc, TypeToken,
};

pub mod prelude {
    pub use crate::compiler::{
        CompilationResult, CompileOptions, CompiledModule, TargetModule, compile_module,
    };
    pub use crate::ir::{
        BinOp, Callee, ConvOp, FloatPredicate, FnSig, FunctionBuilder, InstKind, IntPredicate,
        IrType, Module, ModuleBuilder, ValueRef,
    };
    pub use crate::{CompileError, DebugSink, NullDebugSink, Result};
}
