//! Shared foundation types for the ssalower toolchain.
//!
//! This crate holds everything that both the IR model and the compiler need
//! to agree on:
//!
//! - [`CompileError`] - the unified, fail-fast error taxonomy
//! - [`SourceLoc`] / [`FileId`] - source positions carried by IR metadata
//! - Target handles ([`MethodHandle`], [`FieldHandle`], ...) and the
//!   structural [`TypeToken`] identity for synthesized types
//! - [`DebugSink`] - the symbol-writer boundary for sequence points and
//!   variable names

pub mod debug;
pub mod error;
pub mod handles;
pub mod loc;

pub use debug::{DebugSink, DocId, NullDebugSink};
pub use error::{CompileError, Result};
pub use handles::{FieldHandle, HostId, MethodHandle, SigHandle, TypeToken};
pub use loc::{FileId, SourceLoc};
