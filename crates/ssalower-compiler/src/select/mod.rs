//! Instruction selection: lowering one SSA function to stack bytecode.
//!
//! A [`FunctionSelector`] walks the function's blocks in IR order, emitting
//! into a single chunk. Three pieces of bookkeeping drive the translation:
//!
//! - **Placement** ([`placement`]): decides per instruction whether the
//!   result rides the evaluation stack or goes through a frame local.
//!   Stack-placed instructions are skipped at their own position and
//!   emitted when their single consumer asks for the value.
//! - **Storage**: locals are created on demand. Scalar results get 64-bit
//!   slots, vector and aggregate results get buffer locals sized by the
//!   type mapper, and constant-count allocas get a buffer with no code at
//!   all. Parameters occupy the first locals, matching the call protocol.
//! - **Labels** ([`BlockLabels`]): blocks map 1:1 to label offsets.
//!   Branches to not-yet-emitted blocks become forward jumps patched on
//!   binding; branches to bound labels become backward `Loop` transfers.
//!
//! The per-family lowering lives in the sibling modules: [`arith`] for
//! binary/compare/select, [`memory`] for loads, stores, addressing, and
//! element access, [`control`] for terminators and phi flushing, [`calls`]
//! for direct, indirect, and intrinsic calls, [`convert`] for the cast
//! matrix, and [`shuffle`] for vector shuffles.

mod arith;
mod calls;
mod control;
mod convert;
mod memory;
mod placement;
mod shuffle;

use ssalower_core::{CompileError, DebugSink, MethodHandle, Result, SourceLoc};
use ssalower_ir::{BlockId, Function, InstId, InstKind, IrType, Module, ValueRef};

use crate::bytecode::{BytecodeChunk, OpCode};
use crate::debug::DocumentCache;
use crate::intrinsics::IntrinsicRegistry;
use crate::module::CompiledModule;
use crate::target::{LocalDecl, TargetModule};
use crate::types::{SlotFamily, TypeMapper};
use crate::values::{Place, ValueEmitter};

use placement::Placement;

/// Forward and backward jump bookkeeping, one label per block.
struct BlockLabels {
    bound: Vec<Option<usize>>,
    pending: Vec<Vec<usize>>,
}

impl BlockLabels {
    fn new(blocks: usize) -> Self {
        BlockLabels {
            bound: vec![None; blocks],
            pending: vec![Vec::new(); blocks],
        }
    }

    fn offset(&self, block: BlockId) -> Option<usize> {
        self.bound[usize::from(block)]
    }

    /// Bind `block` at `offset` and drain the jumps waiting on it.
    fn bind(&mut self, block: BlockId, offset: usize) -> Vec<usize> {
        let index = usize::from(block);
        debug_assert!(self.bound[index].is_none(), "label bound twice");
        self.bound[index] = Some(offset);
        std::mem::take(&mut self.pending[index])
    }

    fn register(&mut self, block: BlockId, operand_offset: usize) {
        self.pending[usize::from(block)].push(operand_offset);
    }
}

/// A selected body: the finished chunk plus its frame layout.
pub(crate) struct FunctionArtifacts {
    pub(crate) chunk: BytecodeChunk,
    pub(crate) locals: Vec<LocalDecl>,
}

/// Selects bytecode for one function definition.
///
/// Owns the chunk and local table under construction through the shared
/// [`ValueEmitter`]; placement, label, and debug-event state live here.
/// One selector per function, driven front to back by [`run`].
///
/// [`run`]: FunctionSelector::run
pub(crate) struct FunctionSelector<'a> {
    em: ValueEmitter<'a>,
    func: &'a Function,
    method: MethodHandle,
    intrinsics: &'a IntrinsicRegistry,
    placement: Placement,
    /// Scalar result slots, by instruction.
    slots: Vec<Option<u16>>,
    /// Buffer locals for vector/aggregate results and constant allocas.
    bufs: Vec<Option<u16>>,
    /// Staging buffers for buffer-typed phis (scalars stage on the stack).
    phi_temps: Vec<Option<u16>>,
    /// Unnamed slots reused by short save/restore sequences. Never written
    /// before nested operand emission has finished.
    scratch_slots: [Option<u16>; 3],
    labels: BlockLabels,
    docs: &'a mut DocumentCache,
    sink: &'a mut dyn DebugSink,
    last_seq_offset: Option<usize>,
}

impl<'a> FunctionSelector<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        module: &'a Module,
        types: &'a TypeMapper<'a>,
        symbols: &'a CompiledModule,
        target: &'a mut TargetModule,
        intrinsics: &'a IntrinsicRegistry,
        func: &'a Function,
        method: MethodHandle,
        docs: &'a mut DocumentCache,
        sink: &'a mut dyn DebugSink,
    ) -> Self {
        let placement = Placement::analyze(module, func, types, intrinsics);
        let count = func.insts.len();
        FunctionSelector {
            em: ValueEmitter::new(module, types, symbols, target),
            func,
            method,
            intrinsics,
            placement,
            slots: vec![None; count],
            bufs: vec![None; count],
            phi_temps: vec![None; count],
            scratch_slots: [None; 3],
            labels: BlockLabels::new(func.blocks.len()),
            docs,
            sink,
            last_seq_offset: None,
        }
    }

    /// Emit the whole body and return the finished artifacts.
    pub(crate) fn run(mut self) -> Result<FunctionArtifacts> {
        self.bind_params()?;
        let func = self.func;
        for block_id in func.block_ids() {
            let offset = self.em.chunk.len();
            for operand in self.labels.bind(block_id, offset) {
                self.em.chunk.patch_jump(operand);
            }
            for &inst_id in &func.block(block_id).insts {
                self.emit_instruction(block_id, inst_id)?;
            }
        }
        Ok(FunctionArtifacts {
            chunk: self.em.chunk,
            locals: self.em.locals.into_decls(),
        })
    }

    /// Assign the leading locals to parameters and report their names.
    fn bind_params(&mut self) -> Result<()> {
        for (index, param) in self.func.params.iter().enumerate() {
            let mapped = self.em.types.map(&param.ty)?;
            let local = if mapped.is_buffer() {
                let size = self.em.types.size_of(&param.ty);
                let align = self.em.types.align_of(&param.ty);
                self.em.locals.push_buffer(size, align, param.name.clone())
            } else {
                self.em.locals.push_slot(param.name.clone())
            };
            if let Some(name) = &param.name {
                self.sink.parameter_name(self.method, index as u16, name);
                self.sink.local_name(self.method, local, name);
            }
        }
        Ok(())
    }

    fn emit_instruction(&mut self, block: BlockId, id: InstId) -> Result<()> {
        let inst = self.func.inst(id);
        if let Some(loc) = inst.loc {
            self.sequence_point(loc);
        }
        match &inst.kind {
            // Phi results are written by predecessor edge moves.
            InstKind::Phi { .. } => Ok(()),
            // Storage only; the address materializes at each use.
            InstKind::Alloca {
                count: ValueRef::Const(_),
                ..
            } => Ok(()),
            InstKind::Store { value, ptr } => self.emit_store(id, *value, *ptr),
            InstKind::Ret { value } => self.emit_ret(*value),
            InstKind::Br { target } => self.emit_br(block, *target),
            InstKind::CondBr {
                cond,
                if_true,
                if_false,
            } => self.emit_cond_br(block, *cond, *if_true, *if_false),
            InstKind::Switch {
                value,
                default,
                cases,
            } => self.emit_switch(block, id, *value, *default, cases),
            InstKind::Unreachable => {
                self.em.op(OpCode::Fault);
                Ok(())
            }
            InstKind::Call { .. } if !inst.has_result() => self.emit_call(id),
            InstKind::Unsupported { .. } => Err(self.unsupported(id)),
            // Deferred to the single use site.
            _ if self.placement.on_stack(id) => Ok(()),
            _ => {
                self.emit_inst_value(id)?;
                self.finish_result(id)
            }
        }
    }

    /// Park a freshly computed result: scalars go to their slot (or get
    /// popped when dead), buffer results are already in their local.
    fn finish_result(&mut self, id: InstId) -> Result<()> {
        let ty = &self.func.inst(id).ty;
        if self.em.types.map(ty)?.is_buffer() {
            return Ok(());
        }
        if self.placement.use_count(id) == 0 {
            self.em.op(OpCode::Pop);
        } else {
            let slot = self.slot(id);
            self.em.chunk.emit_set_local(slot, self.em.line);
        }
        Ok(())
    }

    /// Emit the code that computes `id`.
    ///
    /// Postcondition: a scalar result is on the evaluation stack; a
    /// buffer-typed result is in the instruction's buffer local with
    /// nothing pushed.
    fn emit_inst_value(&mut self, id: InstId) -> Result<()> {
        let inst = self.func.inst(id);
        match &inst.kind {
            InstKind::Binary { op, lhs, rhs } => self.emit_binary(id, *op, *lhs, *rhs),
            InstKind::ICmp { pred, lhs, rhs } => self.emit_icmp(id, *pred, *lhs, *rhs),
            InstKind::FCmp { pred, lhs, rhs } => self.emit_fcmp(id, *pred, *lhs, *rhs),
            InstKind::FNeg { operand } => self.emit_fneg(id, *operand),
            InstKind::Alloca { count, .. } => self.emit_alloca(id, *count),
            InstKind::Load { ptr } => self.emit_load(id, *ptr),
            InstKind::Gep {
                base,
                source_ty,
                indices,
            } => self.emit_gep(id, *base, source_ty, indices),
            InstKind::Call { .. } => self.emit_call(id),
            InstKind::Select {
                cond,
                if_true,
                if_false,
            } => self.emit_select(id, *cond, *if_true, *if_false),
            InstKind::Convert { op, operand } => self.emit_convert(id, *op, *operand),
            InstKind::Freeze { operand } => self.emit_freeze(id, *operand),
            InstKind::ExtractElement { vector, index } => {
                self.emit_extract_element(id, *vector, *index)
            }
            InstKind::InsertElement {
                vector,
                elem,
                index,
            } => self.emit_insert_element(id, *vector, *elem, *index),
            InstKind::ShuffleVector { a, b, mask } => self.emit_shuffle(id, *a, *b, mask),
            InstKind::Unsupported { .. } => Err(self.unsupported(id)),
            InstKind::Phi { .. } => unreachable!("phi values are read from their slot"),
            InstKind::Store { .. }
            | InstKind::Ret { .. }
            | InstKind::Br { .. }
            | InstKind::CondBr { .. }
            | InstKind::Switch { .. }
            | InstKind::Unreachable => {
                unreachable!("stores and terminators produce no value")
            }
        }
    }

    /// Push `value` onto the evaluation stack.
    ///
    /// Buffer-typed values push the address of their storage.
    fn emit_value(&mut self, value: ValueRef) -> Result<()> {
        match value {
            ValueRef::Const(id) => self.em.push_constant(id),
            ValueRef::Arg(index) => {
                let ty = &self.func.sig.params[index as usize];
                if self.em.types.map(ty)?.is_buffer() {
                    self.em.chunk.emit_local_addr(index as u16, self.em.line);
                } else {
                    self.em.chunk.emit_get_local(index as u16, self.em.line);
                }
                Ok(())
            }
            ValueRef::Global(id) => {
                let field = self.em.symbols.global(id);
                self.em
                    .push_place_addr(Place::Global(field.index() as u16), 0);
                Ok(())
            }
            ValueRef::Func(id) => {
                let method = self.em.symbols.lookup_function(id).ok_or_else(|| {
                    CompileError::MalformedIr {
                        detail: format!(
                            "function address of intrinsic '{}'",
                            self.em.module.function(id).name
                        ),
                        function: Some(self.func.name.clone()),
                        loc: None,
                    }
                })?;
                self.em.chunk.write_op(OpCode::FuncPtr, self.em.line);
                self.em.chunk.write_u16(method.index() as u16, self.em.line);
                Ok(())
            }
            ValueRef::Inst(id) => {
                // A deferred instruction can already have been forced into
                // a slot ahead of a conditional region.
                if let Some(slot) = self.slots[usize::from(id)] {
                    self.em.chunk.emit_get_local(slot, self.em.line);
                    return Ok(());
                }
                if self.placement.on_stack(id) {
                    return self.emit_inst_value(id);
                }
                let inst = self.func.inst(id);
                if let InstKind::Alloca {
                    count: ValueRef::Const(_),
                    ..
                } = inst.kind
                {
                    let buffer = self.alloca_buffer(id)?;
                    self.em.chunk.emit_local_addr(buffer, self.em.line);
                    return Ok(());
                }
                if self.em.types.map(&inst.ty)?.is_buffer() {
                    let buffer = self.buf_local(id);
                    self.em.chunk.emit_local_addr(buffer, self.em.line);
                } else {
                    let slot = self.slot(id);
                    self.em.chunk.emit_get_local(slot, self.em.line);
                }
                Ok(())
            }
        }
    }

    /// Materialize a deferred effectful computation into its slot before
    /// entering a conditional region, so its side effects run exactly once.
    /// Pure deferrals and clean loads stay deferred; re-evaluating them in
    /// one arm is harmless.
    fn force_to_slot(&mut self, value: ValueRef) -> Result<()> {
        let ValueRef::Inst(id) = value else {
            return Ok(());
        };
        if !self.placement.on_stack(id) || self.slots[usize::from(id)].is_some() {
            return Ok(());
        }
        if placement::is_effectful(self.em.module, self.func, id, self.intrinsics) {
            self.emit_inst_value(id)?;
            let slot = self.slot(id);
            self.em.chunk.emit_set_local(slot, self.em.line);
        }
        Ok(())
    }

    /// Push `value`'s address plus a constant byte offset.
    fn push_value_addr_at(&mut self, value: ValueRef, offset: u64) -> Result<()> {
        self.emit_value(value)?;
        if offset != 0 {
            self.em.push_i64(offset as i64);
            self.em.op(OpCode::AddI64);
        }
        Ok(())
    }

    /// A freeze passes the canonical value through; buffer freezes copy the
    /// operand so the result has stable storage of its own.
    fn emit_freeze(&mut self, id: InstId, operand: ValueRef) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        if self.em.types.map(&ty)?.is_buffer() {
            let size = self.em.types.size_of(&ty);
            let buffer = self.buf_local(id);
            self.em.chunk.emit_local_addr(buffer, self.em.line);
            self.emit_value(operand)?;
            self.em.push_i64(size as i64);
            self.em.op(OpCode::MemCopy);
            Ok(())
        } else {
            self.emit_value(operand)
        }
    }

    // === Storage ===

    /// The scalar result slot for `id`, created on first request.
    fn slot(&mut self, id: InstId) -> u16 {
        if let Some(slot) = self.slots[usize::from(id)] {
            return slot;
        }
        let name = self.func.inst(id).name.clone();
        let slot = self.em.locals.push_slot(name.clone());
        if let Some(name) = &name {
            self.sink.local_name(self.method, slot, name);
        }
        self.slots[usize::from(id)] = Some(slot);
        slot
    }

    /// The buffer local holding `id`'s vector or aggregate result.
    fn buf_local(&mut self, id: InstId) -> u16 {
        if let Some(buffer) = self.bufs[usize::from(id)] {
            return buffer;
        }
        let inst = self.func.inst(id);
        let size = self.em.types.size_of(&inst.ty);
        let align = self.em.types.align_of(&inst.ty);
        let buffer = self.em.locals.push_buffer(size, align, inst.name.clone());
        if let Some(name) = &inst.name {
            self.sink.local_name(self.method, buffer, name);
        }
        self.bufs[usize::from(id)] = Some(buffer);
        buffer
    }

    /// The buffer local backing a constant-count alloca.
    fn alloca_buffer(&mut self, id: InstId) -> Result<u16> {
        if let Some(buffer) = self.bufs[usize::from(id)] {
            return Ok(buffer);
        }
        let inst = self.func.inst(id);
        let InstKind::Alloca { allocated, count } = &inst.kind else {
            unreachable!("alloca storage requested for non-alloca")
        };
        let ValueRef::Const(count) = count else {
            unreachable!("dynamic alloca has no frame buffer")
        };
        let count = self
            .em
            .module
            .constant(*count)
            .as_int()
            .filter(|&n| n >= 0)
            .ok_or_else(|| self.malformed(id, "alloca count is not a non-negative integer"))?;
        let size = self.em.types.size_of(allocated) * count as u64;
        let align = self.em.types.align_of(allocated);
        let buffer = self.em.locals.push_buffer(size, align, inst.name.clone());
        if let Some(name) = &self.func.inst(id).name {
            self.sink.local_name(self.method, buffer, name);
        }
        self.bufs[usize::from(id)] = Some(buffer);
        Ok(buffer)
    }

    /// The staging buffer for a buffer-typed phi. Incoming values land
    /// here first so simultaneous edge assignment cannot read a phi it
    /// already overwrote.
    fn phi_temp(&mut self, id: InstId) -> u16 {
        if let Some(buffer) = self.phi_temps[usize::from(id)] {
            return buffer;
        }
        let ty = &self.func.inst(id).ty;
        let size = self.em.types.size_of(ty);
        let align = self.em.types.align_of(ty);
        let buffer = self.em.locals.push_buffer(size, align, None);
        self.phi_temps[usize::from(id)] = Some(buffer);
        buffer
    }

    /// An unnamed reusable slot for short two-phase sequences.
    fn scratch(&mut self, n: usize) -> u16 {
        if let Some(slot) = self.scratch_slots[n] {
            return slot;
        }
        let slot = self.em.locals.push_slot(None);
        self.scratch_slots[n] = Some(slot);
        slot
    }

    // === Shared lookups ===

    /// The IR type of any operand value.
    fn value_type(&self, value: ValueRef) -> IrType {
        match value {
            ValueRef::Inst(id) => self.func.inst(id).ty.clone(),
            ValueRef::Arg(index) => self.func.sig.params[index as usize].clone(),
            ValueRef::Const(id) => self.em.module.constant(id).ty(),
            ValueRef::Global(_) | ValueRef::Func(_) => IrType::Ptr,
        }
    }

    /// The slot family `ty` maps to, or `UnsupportedInstruction` when the
    /// operation only works on scalars.
    fn scalar_family(&self, id: InstId, ty: &IrType) -> Result<SlotFamily> {
        match self.em.types.map(ty)?.family() {
            Some(family) => Ok(family),
            None => Err(self.unsupported(id)),
        }
    }

    // === Control helpers ===

    /// Emit a transfer to `target`: a backward `Loop` when the label is
    /// bound, otherwise a forward jump patched at binding.
    fn branch_to(&mut self, target: BlockId) {
        match self.labels.offset(target) {
            Some(offset) => self.em.chunk.emit_loop(offset, self.em.line),
            None => {
                let operand = self.em.chunk.emit_jump(OpCode::Jump, self.em.line);
                self.labels.register(target, operand);
            }
        }
    }

    // === Debug events ===

    fn sequence_point(&mut self, loc: SourceLoc) {
        self.em.line = loc.line;
        let offset = self.em.chunk.len();
        // Instructions that emitted nothing share an offset with their
        // successor; the first statement boundary wins.
        if self.last_seq_offset == Some(offset) {
            return;
        }
        self.last_seq_offset = Some(offset);
        let doc = self.docs.doc_for(self.em.module, loc.file, self.sink);
        self.sink
            .sequence_point(self.method, offset, doc, loc.line, loc.col);
    }

    // === Diagnostics ===

    fn unsupported(&self, id: InstId) -> CompileError {
        let inst = self.func.inst(id);
        CompileError::UnsupportedInstruction {
            opcode: inst.opcode().to_string(),
            function: self.func.name.clone(),
            loc: inst.loc,
        }
    }

    fn malformed(&self, id: InstId, detail: impl Into<String>) -> CompileError {
        CompileError::MalformedIr {
            detail: detail.into(),
            function: Some(self.func.name.clone()),
            loc: self.func.inst(id).loc,
        }
    }
}
