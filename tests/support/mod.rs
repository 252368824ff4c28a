//! Shared harness for the integration tests: compile helpers plus the
//! reference machine in [`vm`].

#![allow(dead_code)]

pub mod vm;

use ssalower::prelude::*;

/// Lower a module with default options, discarding debug output.
pub fn try_lower(module: &Module) -> Result<CompilationResult> {
    compile_module(module, &CompileOptions::default(), &mut NullDebugSink)
}

/// Lower a module that is expected to compile.
pub fn lower(module: &Module) -> CompilationResult {
    try_lower(module).expect("module should compile")
}

/// Lower a module and boot a machine over it, with globals initialized.
pub fn boot(module: &Module) -> vm::Machine {
    let mut machine = vm::Machine::load(lower(module).target);
    machine.run_initializer();
    machine
}
