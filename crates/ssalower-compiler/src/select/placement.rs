//! Stack-versus-local placement of instruction results.
//!
//! A result can ride the evaluation stack only when deferring its
//! computation to its single use site cannot change what it computes.
//! Everything else gets a frame local. The rules, in order:
//!
//! 1. zero or multiple uses, a use in another block, or a use by a phi:
//!    local;
//! 2. allocas: local (their address must be stable);
//! 3. the single use is the textually next instruction: stack - nothing
//!    can run in between;
//! 4. loads: stack if no possibly-effectful instruction sits between the
//!    load and its use;
//! 5. otherwise: stack only if the whole operand chain re-evaluates to
//!    the same value at the use site (arithmetic over constants,
//!    arguments, and slot reads).
//!
//! Vector and aggregate results always live in their buffer local; there
//! is no slot to save by deferring them.

use ssalower_ir::{BlockId, Callee, Function, InstId, InstKind, Module, ValueRef};

use crate::intrinsics::IntrinsicRegistry;
use crate::types::TypeMapper;

#[derive(Debug, Clone, Copy)]
struct UseSite {
    block: BlockId,
    position: usize,
    by_phi: bool,
}

/// Placement decisions for one function.
#[derive(Debug)]
pub(crate) struct Placement {
    stack: Vec<bool>,
    uses: Vec<u32>,
}

impl Placement {
    /// True if the instruction's result rides the evaluation stack and
    /// is emitted at its use site.
    pub(crate) fn on_stack(&self, id: InstId) -> bool {
        self.stack[usize::from(id)]
    }

    /// Number of uses the instruction's result has.
    pub(crate) fn use_count(&self, id: InstId) -> u32 {
        self.uses[usize::from(id)]
    }

    pub(crate) fn analyze(
        module: &Module,
        func: &Function,
        types: &TypeMapper<'_>,
        intrinsics: &IntrinsicRegistry,
    ) -> Placement {
        let count = func.insts.len();
        let mut uses = vec![0u32; count];
        let mut single_use: Vec<Option<UseSite>> = vec![None; count];

        for block_id in func.block_ids() {
            let block = func.block(block_id);
            for (position, &inst_id) in block.insts.iter().enumerate() {
                let inst = func.inst(inst_id);
                let by_phi = inst.kind.is_phi();
                inst.for_each_operand(|operand| {
                    if let ValueRef::Inst(used) = operand {
                        let idx = usize::from(used);
                        uses[idx] += 1;
                        single_use[idx] = if uses[idx] == 1 {
                            Some(UseSite {
                                block: block_id,
                                position,
                                by_phi,
                            })
                        } else {
                            None
                        };
                    }
                });
            }
        }

        let mut stack = vec![false; count];
        for block_id in func.block_ids() {
            let block = func.block(block_id);
            for (position, &inst_id) in block.insts.iter().enumerate() {
                stack[usize::from(inst_id)] = can_push(
                    module,
                    func,
                    types,
                    intrinsics,
                    &stack,
                    &uses,
                    single_use[usize::from(inst_id)],
                    block_id,
                    position,
                    inst_id,
                );
            }
        }

        Placement { stack, uses }
    }
}

#[allow(clippy::too_many_arguments)]
fn can_push(
    module: &Module,
    func: &Function,
    types: &TypeMapper<'_>,
    intrinsics: &IntrinsicRegistry,
    stack: &[bool],
    uses: &[u32],
    site: Option<UseSite>,
    block: BlockId,
    position: usize,
    id: InstId,
) -> bool {
    let inst = func.inst(id);
    if !inst.has_result() || inst.kind.is_phi() {
        return false;
    }
    if uses[usize::from(id)] != 1 {
        return false;
    }
    let Some(site) = site else { return false };
    if site.by_phi || site.block != block {
        return false;
    }
    if matches!(inst.kind, InstKind::Alloca { .. }) {
        return false;
    }
    // Buffer-backed results stay in their buffer local.
    if types.map(&inst.ty).map(|t| t.is_buffer()).unwrap_or(true) {
        return false;
    }

    // The textually next instruction consumes it: nothing can interfere.
    if site.position == position + 1 {
        return true;
    }

    if matches!(inst.kind, InstKind::Load { .. }) {
        let insts = &func.block(block).insts;
        return insts[position + 1..site.position]
            .iter()
            .all(|&between| !is_effectful(module, func, between, intrinsics));
    }

    is_inst_pure(module, func, intrinsics, stack, id)
}

/// Could running this instruction change a value someone else reads?
pub(super) fn is_effectful(
    module: &Module,
    func: &Function,
    id: InstId,
    intrinsics: &IntrinsicRegistry,
) -> bool {
    match &func.inst(id).kind {
        InstKind::Store { .. } => true,
        InstKind::Alloca { count, .. } => {
            // Constant-count allocas emit no code at their position.
            !matches!(count, ValueRef::Const(_))
        }
        InstKind::Call { callee, .. } => !is_pure_call(module, callee, intrinsics),
        InstKind::Unsupported { .. } => true,
        _ => false,
    }
}

fn is_pure_call(module: &Module, callee: &Callee, intrinsics: &IntrinsicRegistry) -> bool {
    match callee {
        Callee::Func(func_id) => {
            let callee = module.function(*func_id);
            callee.is_intrinsic() && intrinsics.is_pure(&callee.name)
        }
        Callee::Value(_) => false,
    }
}

/// Would re-evaluating this instruction at a later point in its block
/// produce the same value?
fn is_inst_pure(
    module: &Module,
    func: &Function,
    intrinsics: &IntrinsicRegistry,
    stack: &[bool],
    id: InstId,
) -> bool {
    let inst = func.inst(id);
    let shape_ok = match &inst.kind {
        InstKind::Binary { .. }
        | InstKind::ICmp { .. }
        | InstKind::FCmp { .. }
        | InstKind::FNeg { .. }
        | InstKind::Convert { .. }
        | InstKind::Freeze { .. }
        | InstKind::Gep { .. } => true,
        InstKind::Call { callee, .. } => is_pure_call(module, callee, intrinsics),
        _ => false,
    };
    if !shape_ok {
        return false;
    }

    let mut pure = true;
    inst.for_each_operand(|operand| {
        pure &= is_value_pure(module, func, intrinsics, stack, operand);
    });
    pure
}

fn is_value_pure(
    module: &Module,
    func: &Function,
    intrinsics: &IntrinsicRegistry,
    stack: &[bool],
    value: ValueRef,
) -> bool {
    match value {
        ValueRef::Const(_) | ValueRef::Arg(_) | ValueRef::Func(_) => true,
        ValueRef::Global(_) => false,
        ValueRef::Inst(id) => {
            if !stack[usize::from(id)] {
                // Slot reads are stable; the slot is written once, at the
                // definition, which precedes any use.
                true
            } else {
                is_inst_pure(module, func, intrinsics, stack, id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssalower_ir::{BinOp, DataLayout, FnSig, IrType, ModuleBuilder};

    fn analyze(module: &Module) -> Placement {
        let func = &module.functions[0];
        let layout = DataLayout::default();
        let types = TypeMapper::new(&layout);
        let intrinsics = IntrinsicRegistry::new();
        Placement::analyze(module, func, &types, &intrinsics)
    }

    #[test]
    fn next_use_rides_the_stack() {
        let mut builder = ModuleBuilder::new("m");
        let f = builder.declare_function("f", FnSig::new(vec![IrType::I32], IrType::I32));
        let mut fb = builder.function_builder(f);
        fb.block();
        let one = fb.const_i32(1);
        let sum = fb.binary(BinOp::Add, ValueRef::Arg(0), one, IrType::I32);
        fb.ret(sum);
        let module = builder.finish();

        let placement = analyze(&module);
        assert!(placement.on_stack(sum));
        assert_eq!(placement.use_count(sum), 1);
    }

    #[test]
    fn load_with_intervening_call_takes_a_local() {
        let mut builder = ModuleBuilder::new("m");
        let noise = builder.declare_function("noise", FnSig::new(vec![], IrType::Void));
        let f = builder.declare_function("f", FnSig::new(vec![IrType::Ptr], IrType::I32));
        let mut fb = builder.function_builder(f);
        fb.block();
        let loaded = fb.load(IrType::I32, ValueRef::Arg(0));
        fb.call(noise, vec![]);
        fb.ret(loaded);
        let module = builder.finish();

        let func = &module.functions[1];
        let layout = DataLayout::default();
        let types = TypeMapper::new(&layout);
        let intrinsics = IntrinsicRegistry::new();
        let placement = Placement::analyze(&module, func, &types, &intrinsics);
        assert!(!placement.on_stack(loaded));
    }

    #[test]
    fn load_with_clean_interval_rides_the_stack() {
        let mut builder = ModuleBuilder::new("m");
        let f = builder.declare_function(
            "f",
            FnSig::new(vec![IrType::Ptr, IrType::I32], IrType::I32),
        );
        let mut fb = builder.function_builder(f);
        fb.block();
        let loaded = fb.load(IrType::I32, ValueRef::Arg(0));
        let two = fb.const_i32(2);
        let doubled = fb.binary(BinOp::Mul, ValueRef::Arg(1), two, IrType::I32);
        let sum = fb.binary(BinOp::Add, doubled, loaded, IrType::I32);
        fb.ret(sum);
        let module = builder.finish();

        let placement = analyze(&module);
        assert!(placement.on_stack(loaded));
        assert!(placement.on_stack(doubled));
        assert!(placement.on_stack(sum));
    }

    #[test]
    fn multiple_uses_take_a_local() {
        let mut builder = ModuleBuilder::new("m");
        let f = builder.declare_function("f", FnSig::new(vec![IrType::I32], IrType::I32));
        let mut fb = builder.function_builder(f);
        fb.block();
        let squared = fb.binary(BinOp::Mul, ValueRef::Arg(0), ValueRef::Arg(0), IrType::I32);
        let sum = fb.binary(BinOp::Add, squared, squared, IrType::I32);
        fb.ret(sum);
        let module = builder.finish();

        let placement = analyze(&module);
        assert!(!placement.on_stack(squared));
        assert_eq!(placement.use_count(squared), 2);
        assert!(placement.on_stack(sum));
    }

    #[test]
    fn phi_uses_take_a_local() {
        let mut builder = ModuleBuilder::new("m");
        let f = builder.declare_function("f", FnSig::new(vec![IrType::I32], IrType::I32));
        let mut fb = builder.function_builder(f);
        let entry = fb.block();
        fb.switch_to(entry);
        let one = fb.const_i32(1);
        let seed = fb.binary(BinOp::Add, ValueRef::Arg(0), one, IrType::I32);
        let exit = fb.block();
        fb.switch_to(entry);
        fb.br(exit);
        fb.switch_to(exit);
        let merged = fb.phi(IrType::I32);
        fb.add_incoming(merged, entry, seed);
        fb.ret(merged);
        let module = builder.finish();

        let placement = analyze(&module);
        // Its only use is a phi incoming, so it cannot be deferred.
        assert!(!placement.on_stack(seed));
        assert!(!placement.on_stack(merged));
    }

    #[test]
    fn alloca_takes_a_local() {
        let mut builder = ModuleBuilder::new("m");
        let f = builder.declare_function("f", FnSig::new(vec![], IrType::I32));
        let mut fb = builder.function_builder(f);
        fb.block();
        let one = fb.const_i32(1);
        let slot = fb.alloca(IrType::I32, one);
        let loaded = fb.load(IrType::I32, slot);
        fb.ret(loaded);
        let module = builder.finish();

        let placement = analyze(&module);
        assert!(!placement.on_stack(slot));
        assert!(placement.on_stack(loaded));
    }

    #[test]
    fn pure_chain_defers_past_a_store() {
        let mut builder = ModuleBuilder::new("m");
        let f = builder.declare_function(
            "f",
            FnSig::new(vec![IrType::I32, IrType::Ptr], IrType::I32),
        );
        let mut fb = builder.function_builder(f);
        fb.block();
        let squared = fb.binary(BinOp::Mul, ValueRef::Arg(0), ValueRef::Arg(0), IrType::I32);
        let zero = fb.const_i32(0);
        fb.store(zero, ValueRef::Arg(1));
        fb.ret(squared);
        let module = builder.finish();

        let placement = analyze(&module);
        // Arithmetic over arguments re-evaluates identically after the store.
        assert!(placement.on_stack(squared));
    }

    #[test]
    fn call_result_used_later_takes_a_local() {
        let mut builder = ModuleBuilder::new("m");
        let source = builder.declare_function("source", FnSig::new(vec![], IrType::I32));
        let f = builder.declare_function("f", FnSig::new(vec![IrType::I32], IrType::I32));
        let mut fb = builder.function_builder(f);
        fb.block();
        let fetched = fb.call(source, vec![]);
        let one = fb.const_i32(1);
        let bump = fb.binary(BinOp::Add, ValueRef::Arg(0), one, IrType::I32);
        let sum = fb.binary(BinOp::Add, bump, fetched, IrType::I32);
        fb.ret(sum);
        let module = builder.finish();

        let func = &module.functions[1];
        let layout = DataLayout::default();
        let types = TypeMapper::new(&layout);
        let intrinsics = IntrinsicRegistry::new();
        let placement = Placement::analyze(&module, func, &types, &intrinsics);
        // The call is not the textually previous instruction of its use,
        // and calls do not re-evaluate freely.
        assert!(!placement.on_stack(fetched));
        assert!(placement.on_stack(bump));
    }
}
