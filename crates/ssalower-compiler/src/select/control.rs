//! Terminator lowering and phi data flow.
//!
//! Every control transfer flushes the target block's phis first. Moves on
//! an edge are a simultaneous assignment: all incomings are read (parked
//! on the stack, or copied into staging buffers) before any phi storage is
//! written, so phis that feed each other's incomings cannot observe
//! half-updated state.
//!
//! Conditional branches fuse with a deferred compare when the condition's
//! only consumer is the branch, turning `cmp; brtrue` into one
//! compare-and-branch opcode. Switches park the selector in a slot, emit
//! dense runs of consecutive case values as a `JumpTable`, and fall back
//! to equality tests for sparse cases.

use ssalower_core::Result;
use ssalower_ir::{BlockId, FloatPredicate, InstId, InstKind, IntPredicate, ValueRef};

use crate::bytecode::OpCode;
use crate::types::SlotFamily;

use super::FunctionSelector;

impl FunctionSelector<'_> {
    pub(super) fn emit_ret(&mut self, value: Option<ValueRef>) -> Result<()> {
        match value {
            Some(value) => {
                // Buffer-typed returns push the storage address; the caller
                // protocol copies the bytes out.
                self.emit_value(value)?;
                self.em.op(OpCode::Return);
            }
            None => self.em.op(OpCode::ReturnVoid),
        }
        Ok(())
    }

    pub(super) fn emit_br(&mut self, from: BlockId, target: BlockId) -> Result<()> {
        self.phi_moves(from, target)?;
        self.branch_to(target);
        Ok(())
    }

    pub(super) fn emit_cond_br(
        &mut self,
        from: BlockId,
        cond: ValueRef,
        if_true: BlockId,
        if_false: BlockId,
    ) -> Result<()> {
        if self.block_has_phis(if_true) || self.block_has_phis(if_false) {
            // Each edge needs its own move sequence between the test and
            // the transfer.
            self.emit_value(cond)?;
            let skip = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
            self.phi_moves(from, if_true)?;
            self.branch_to(if_true);
            self.em.chunk.patch_jump(skip);
            self.phi_moves(from, if_false)?;
            self.branch_to(if_false);
            return Ok(());
        }

        if self.try_fused_branch(cond, if_true)? {
            self.branch_to(if_false);
            return Ok(());
        }

        self.emit_value(cond)?;
        match self.labels.offset(if_true) {
            Some(offset) => {
                // Backward true edge: invert around a `Loop`.
                let skip = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
                self.em.chunk.emit_loop(offset, self.em.line);
                self.em.chunk.patch_jump(skip);
            }
            None => {
                let operand = self.em.chunk.emit_jump(OpCode::JumpIfTrue, self.em.line);
                self.labels.register(if_true, operand);
            }
        }
        self.branch_to(if_false);
        Ok(())
    }

    /// Fuse a deferred compare directly into a branch opcode. Applies when
    /// the condition is stack-placed (so this branch is its only consumer)
    /// and the true target lies ahead. Unordered float predicates stay on
    /// the value path; the fused forms have no negated variants.
    fn try_fused_branch(&mut self, cond: ValueRef, if_true: BlockId) -> Result<bool> {
        let ValueRef::Inst(cond_id) = cond else {
            return Ok(false);
        };
        if !self.placement.on_stack(cond_id) || self.labels.offset(if_true).is_some() {
            return Ok(false);
        }
        let op = match &self.func.inst(cond_id).kind {
            InstKind::ICmp { pred, lhs, rhs } => {
                let (pred, lhs, rhs) = (*pred, *lhs, *rhs);
                let family = self.push_icmp_operands(cond_id, pred, lhs, rhs)?;
                fused_icmp_op(pred, family)
            }
            InstKind::FCmp { pred, lhs, rhs } if pred.is_ordered() => {
                let (pred, lhs, rhs) = (*pred, *lhs, *rhs);
                let family = self.push_fcmp_operands(cond_id, lhs, rhs)?;
                fused_fcmp_op(pred, family)
            }
            _ => return Ok(false),
        };
        let operand = self.em.chunk.emit_jump(op, self.em.line);
        self.labels.register(if_true, operand);
        Ok(true)
    }

    pub(super) fn emit_switch(
        &mut self,
        from: BlockId,
        id: InstId,
        value: ValueRef,
        default: BlockId,
        cases: &[(i64, BlockId)],
    ) -> Result<()> {
        let ty = self.value_type(value);
        let family = match self.em.types.map(&ty)?.family() {
            Some(family @ (SlotFamily::I32 | SlotFamily::I64)) => family,
            _ => return Err(self.malformed(id, "switch on a non-integer value")),
        };

        // The selector is re-read once per test; park it in a slot.
        self.emit_value(value)?;
        let selector = self.scratch(0);
        self.em.chunk.emit_set_local(selector, self.em.line);

        let phi_edges = self.block_has_phis(default)
            || cases.iter().any(|&(_, target)| self.block_has_phis(target));
        if phi_edges {
            // Per-case trampolines: test, flush the edge's moves, transfer.
            for &(case, target) in cases {
                self.em.chunk.emit_get_local(selector, self.em.line);
                self.push_case_value(family, case);
                self.em.op(equality_op(family));
                let skip = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
                self.phi_moves(from, target)?;
                self.branch_to(target);
                self.em.chunk.patch_jump(skip);
            }
            self.phi_moves(from, default)?;
            self.branch_to(default);
            return Ok(());
        }

        let mut sorted: Vec<(i64, BlockId)> = cases.to_vec();
        sorted.sort_by_key(|&(case, _)| case);

        let mut start = 0;
        while start < sorted.len() {
            let mut end = start + 1;
            while end < sorted.len() && sorted[end].0 == sorted[end - 1].0 + 1 {
                end += 1;
            }
            let run = &sorted[start..end];
            let dense =
                run.len() >= 2 && run.iter().all(|&(_, target)| self.labels.offset(target).is_none());
            if dense {
                self.emit_jump_table_run(selector, family, run);
            } else {
                for &(case, target) in run {
                    self.equality_branch(selector, case, family, target);
                }
            }
            start = end;
        }
        self.branch_to(default);
        Ok(())
    }

    /// Dense dispatch over a run of consecutive case values. The rebased
    /// selector wraps below zero, so anything outside the run falls
    /// through to the next test.
    fn emit_jump_table_run(&mut self, selector: u16, family: SlotFamily, run: &[(i64, BlockId)]) {
        self.em.chunk.emit_get_local(selector, self.em.line);
        let base = run[0].0;
        if base != 0 {
            self.push_case_value(family, base);
            self.em.op(match family {
                SlotFamily::I64 => OpCode::SubI64,
                _ => OpCode::SubI32,
            });
        }
        let entries = self.em.chunk.emit_jump_table(run.len(), self.em.line);
        for (operand, &(_, target)) in entries.iter().zip(run) {
            self.labels.register(target, *operand);
        }
    }

    /// One sparse case test: transfer to `target` when the selector equals
    /// `case`, otherwise fall through.
    fn equality_branch(&mut self, selector: u16, case: i64, family: SlotFamily, target: BlockId) {
        self.em.chunk.emit_get_local(selector, self.em.line);
        self.push_case_value(family, case);
        match self.labels.offset(target) {
            None => {
                let op = match family {
                    SlotFamily::I64 => OpCode::BrEqI64,
                    _ => OpCode::BrEqI32,
                };
                let operand = self.em.chunk.emit_jump(op, self.em.line);
                self.labels.register(target, operand);
            }
            Some(offset) => {
                self.em.op(equality_op(family));
                let skip = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
                self.em.chunk.emit_loop(offset, self.em.line);
                self.em.chunk.patch_jump(skip);
            }
        }
    }

    fn push_case_value(&mut self, family: SlotFamily, case: i64) {
        match family {
            SlotFamily::I64 => self.em.push_i64(case),
            _ => self.em.push_i32(case as i32),
        }
    }

    fn block_has_phis(&self, block: BlockId) -> bool {
        self.func
            .block(block)
            .insts
            .first()
            .is_some_and(|&id| self.func.inst(id).kind.is_phi())
    }

    /// Flush the moves for the edge `from -> to`.
    fn phi_moves(&mut self, from: BlockId, to: BlockId) -> Result<()> {
        let func = self.func;
        let mut moves: Vec<(InstId, ValueRef)> = Vec::new();
        for &inst_id in &func.block(to).insts {
            let inst = func.inst(inst_id);
            let InstKind::Phi { incomings } = &inst.kind else {
                break;
            };
            let Some(&(_, value)) = incomings.iter().find(|(pred, _)| *pred == from) else {
                return Err(
                    self.malformed(inst_id, "phi has no incoming value for predecessor edge")
                );
            };
            moves.push((inst_id, value));
        }

        // Read all incomings before writing any phi storage.
        for &(phi, value) in &moves {
            let ty = func.inst(phi).ty.clone();
            if self.em.types.map(&ty)?.is_buffer() {
                let temp = self.phi_temp(phi);
                let size = self.em.types.size_of(&ty);
                self.em.chunk.emit_local_addr(temp, self.em.line);
                self.emit_value(value)?;
                self.em.push_i64(size as i64);
                self.em.op(OpCode::MemCopy);
            } else {
                self.emit_value(value)?;
            }
        }
        for &(phi, _) in moves.iter().rev() {
            let ty = func.inst(phi).ty.clone();
            if self.em.types.map(&ty)?.is_buffer() {
                let temp = self.phi_temp(phi);
                let dest = self.buf_local(phi);
                let size = self.em.types.size_of(&ty);
                self.em.chunk.emit_local_addr(dest, self.em.line);
                self.em.chunk.emit_local_addr(temp, self.em.line);
                self.em.push_i64(size as i64);
                self.em.op(OpCode::MemCopy);
            } else {
                let slot = self.slot(phi);
                self.em.chunk.emit_set_local(slot, self.em.line);
            }
        }
        Ok(())
    }
}

fn equality_op(family: SlotFamily) -> OpCode {
    match family {
        SlotFamily::I64 => OpCode::EqI64,
        _ => OpCode::EqI32,
    }
}

fn fused_icmp_op(pred: IntPredicate, family: SlotFamily) -> OpCode {
    use OpCode::*;
    let wide = matches!(family, SlotFamily::I64 | SlotFamily::Ptr);
    match pred {
        IntPredicate::Eq => {
            if wide {
                BrEqI64
            } else {
                BrEqI32
            }
        }
        IntPredicate::Ne => {
            if wide {
                BrNeI64
            } else {
                BrNeI32
            }
        }
        IntPredicate::Slt => {
            if wide {
                BrLtI64
            } else {
                BrLtI32
            }
        }
        IntPredicate::Sle => {
            if wide {
                BrLeI64
            } else {
                BrLeI32
            }
        }
        IntPredicate::Sgt => {
            if wide {
                BrGtI64
            } else {
                BrGtI32
            }
        }
        IntPredicate::Sge => {
            if wide {
                BrGeI64
            } else {
                BrGeI32
            }
        }
        IntPredicate::Ult => {
            if wide {
                BrLtU64
            } else {
                BrLtU32
            }
        }
        IntPredicate::Ule => {
            if wide {
                BrLeU64
            } else {
                BrLeU32
            }
        }
        IntPredicate::Ugt => {
            if wide {
                BrGtU64
            } else {
                BrGtU32
            }
        }
        IntPredicate::Uge => {
            if wide {
                BrGeU64
            } else {
                BrGeU32
            }
        }
    }
}

fn fused_fcmp_op(pred: FloatPredicate, family: SlotFamily) -> OpCode {
    use OpCode::*;
    let double = matches!(family, SlotFamily::F64);
    match pred {
        FloatPredicate::Oeq => {
            if double {
                BrEqF64
            } else {
                BrEqF32
            }
        }
        FloatPredicate::One => {
            if double {
                BrNeF64
            } else {
                BrNeF32
            }
        }
        FloatPredicate::Olt => {
            if double {
                BrLtF64
            } else {
                BrLtF32
            }
        }
        FloatPredicate::Ole => {
            if double {
                BrLeF64
            } else {
                BrLeF32
            }
        }
        FloatPredicate::Ogt => {
            if double {
                BrGtF64
            } else {
                BrGtF32
            }
        }
        FloatPredicate::Oge => {
            if double {
                BrGeF64
            } else {
                BrGeF32
            }
        }
        _ => unreachable!("unordered predicates are not fused"),
    }
}
