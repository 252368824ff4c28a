//! Lowering from SSA IR to stack-machine bytecode.
//!
//! This crate is the backend of the pipeline: it consumes an immutable
//! [`ssalower_ir::Module`] and produces a [`TargetModule`] holding methods
//! with bytecode bodies, global storage, native and host import tables,
//! interned call-site signatures, and a constant pool.
//!
//! # Architecture
//!
//! Compilation runs in two strictly ordered passes driven by
//! [`ModuleCompiler`]:
//!
//! 1. **Declare** walks globals and functions, assigning field and method
//!    handles into the read-only [`CompiledModule`] symbol table. Body-less
//!    declarations become trampolines over the native import table;
//!    intrinsic declarations are never materialized.
//! 2. **Emit** synthesizes the global initializer, then runs a
//!    per-function instruction selector over every definition. The
//!    selector first decides, per SSA value, whether the result can ride
//!    the operand stack to its single consumer or needs a frame local,
//!    then emits bytecode block by block, resolving phis with parallel
//!    copies and forwarding debug metadata to the caller's
//!    [`DebugSink`](ssalower_core::DebugSink).
//!
//! # Example
//!
//! ```
//! use ssalower_compiler::{CompileOptions, compile_module};
//! use ssalower_core::NullDebugSink;
//! use ssalower_ir::{FnSig, IrType, ModuleBuilder};
//!
//! let mut builder = ModuleBuilder::new("demo");
//! let mut f = builder.define_function("main", FnSig::new(vec![], IrType::I32));
//! f.block();
//! let zero = f.const_i32(0);
//! f.ret(zero);
//! let module = builder.finish();
//!
//! let result = compile_module(&module, &CompileOptions::default(), &mut NullDebugSink)?;
//! assert!(result.target.entry_point.is_some());
//! # Ok::<(), ssalower_core::CompileError>(())
//! ```

pub mod bytecode;
mod debug;
mod intrinsics;
pub mod module;
pub mod options;
mod select;
pub mod target;
pub mod types;
mod values;

pub use bytecode::{BytecodeChunk, ConstantPool, OpCode};
pub use module::{CompilationResult, CompiledModule, ModuleCompiler, compile_module};
pub use options::CompileOptions;
pub use target::{
    GlobalDef, GlobalFlags, HostImport, LocalDecl, LocalKind, MethodDef, MethodFlags, MethodSig,
    NativeImport, SigType, TargetModule,
};
pub use types::{ElemKind, TargetTypeDef, VecShape};
