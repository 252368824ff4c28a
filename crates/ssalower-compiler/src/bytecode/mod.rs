//! Bytecode types for the lowering backend.
//!
//! This module contains the core bytecode types:
//!
//! - [`OpCode`] - The instruction set of the target machine
//! - [`BytecodeChunk`] - Compiled bytecode for a method body
//! - [`Constant`] and [`ConstantPool`] - Module-level constant storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::BytecodeChunk;
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
