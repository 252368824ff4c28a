//! Arithmetic, compares, negation, and select.
//!
//! Scalar operations pick an opcode by slot family. Sub-32-bit integers
//! compute in i32 slots under a canonical form: i8/i16 values are
//! sign-extended to 32 bits, i1 values are 0 or 1. Operations closed over
//! that form (and/or/xor, signed division, arithmetic shift, equality)
//! emit nothing extra. Operations that can leave the form re-narrow the
//! result (`ConvI32I8`/`ConvI32I16`, or a mask for i1), and unsigned
//! operations zero out the extension bits of their operands first
//! (`ConvI32U8`/`ConvI32U16`).
//!
//! Vector operations prefer one host call per instruction when the type
//! maps onto a SIMD register bucket; vectors that fall back to aggregate
//! storage - and remainders, which the host set does not carry - are
//! expanded to a scalar sequence per lane. Compares produce byte-lane
//! masks, one 0/1 byte per lane.

use ssalower_core::Result;
use ssalower_ir::{BinOp, Constant, FloatPredicate, InstId, IntPredicate, IrType, ValueRef};

use crate::bytecode::OpCode;
use crate::target::SigType;
use crate::types::{ElemKind, SlotFamily, TargetType};
use crate::values::{Place, scalar_load_op, scalar_store_op};

use super::FunctionSelector;

impl FunctionSelector<'_> {
    pub(super) fn emit_binary(
        &mut self,
        id: InstId,
        op: BinOp,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        if matches!(ty, IrType::Vector { .. }) {
            return self.emit_vector_binary(id, op, lhs, rhs);
        }
        let family = self.scalar_family(id, &ty)?;
        let opcode = binary_opcode(op, family).ok_or_else(|| {
            self.malformed(
                id,
                format!("'{}' applied to mismatched operand family", op.name()),
            )
        })?;
        let width = ty.int_width();
        let (zero_lhs, zero_rhs) = operand_zeroing(op);
        self.emit_value(lhs)?;
        if zero_lhs {
            self.zeroize_small(width);
        }
        self.emit_value(rhs)?;
        if zero_rhs {
            self.zeroize_small(width);
        }
        self.em.op(opcode);
        self.post_canonicalize(op, width);
        Ok(())
    }

    pub(super) fn emit_icmp(
        &mut self,
        id: InstId,
        pred: IntPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<()> {
        if matches!(self.value_type(lhs), IrType::Vector { .. }) {
            return self.emit_vector_icmp(id, pred, lhs, rhs);
        }
        let family = self.push_icmp_operands(id, pred, lhs, rhs)?;
        self.em.op(icmp_value_op(pred, family));
        Ok(())
    }

    pub(super) fn emit_fcmp(
        &mut self,
        id: InstId,
        pred: FloatPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<()> {
        if matches!(self.value_type(lhs), IrType::Vector { .. }) {
            return self.emit_vector_fcmp(id, pred, lhs, rhs);
        }
        let (ordered, negate) = pred.as_ordered();
        let family = self.push_fcmp_operands(id, lhs, rhs)?;
        self.em.op(fcmp_value_op(ordered, family));
        if negate {
            self.em.op(OpCode::Not);
        }
        Ok(())
    }

    pub(super) fn emit_fneg(&mut self, id: InstId, operand: ValueRef) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        match self.em.types.map(&ty)? {
            TargetType::F32 => {
                self.emit_value(operand)?;
                self.em.op(OpCode::NegF32);
                Ok(())
            }
            TargetType::F64 => {
                self.emit_value(operand)?;
                self.em.op(OpCode::NegF64);
                Ok(())
            }
            TargetType::Vector(shape)
                if matches!(shape.elem, ElemKind::F32 | ElemKind::F64) =>
            {
                let dest = self.buf_local(id);
                self.em.chunk.emit_local_addr(dest, self.em.line);
                self.emit_value(operand)?;
                let host = self.em.target.intern_host(
                    format!("vec{}.fneg.{}", shape.bits, shape.elem.name()),
                    vec![SigType::Ptr, SigType::Ptr],
                    None,
                );
                self.em.chunk.write_op(OpCode::CallHost, self.em.line);
                self.em.chunk.write_u16(host, self.em.line);
                Ok(())
            }
            TargetType::Aggregate(_) if matches!(ty, IrType::Vector { .. }) => {
                self.lane_fneg(id, &ty, operand)
            }
            _ => Err(self.malformed(id, "fneg on a non-float value")),
        }
    }

    pub(super) fn emit_select(
        &mut self,
        id: InstId,
        cond: ValueRef,
        if_true: ValueRef,
        if_false: ValueRef,
    ) -> Result<()> {
        if matches!(self.value_type(cond), IrType::Vector { .. }) {
            return self.emit_vector_select(id, cond, if_true, if_false);
        }
        let ty = self.func.inst(id).ty.clone();
        if self.em.types.map(&ty)?.is_buffer() {
            // Branch over whole-buffer copies into the result storage.
            let size = self.em.types.size_of(&ty);
            let dest = self.buf_local(id);
            self.emit_value(cond)?;
            let to_false = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(if_true)?;
            self.em.push_i64(size as i64);
            self.em.op(OpCode::MemCopy);
            let to_end = self.em.chunk.emit_jump(OpCode::Jump, self.em.line);
            self.em.chunk.patch_jump(to_false);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(if_false)?;
            self.em.push_i64(size as i64);
            self.em.op(OpCode::MemCopy);
            self.em.chunk.patch_jump(to_end);
            return Ok(());
        }
        // Both arms are evaluated in the IR; a deferred effectful arm must
        // not end up running on only one path.
        self.force_to_slot(if_true)?;
        self.force_to_slot(if_false)?;
        self.emit_value(cond)?;
        let to_false = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
        self.emit_value(if_true)?;
        let to_end = self.em.chunk.emit_jump(OpCode::Jump, self.em.line);
        self.em.chunk.patch_jump(to_false);
        self.emit_value(if_false)?;
        self.em.chunk.patch_jump(to_end);
        Ok(())
    }

    // === Operand helpers shared with the fused-branch path ===

    /// Push both integer-compare operands, zeroing extension bits when the
    /// predicate reads them unsigned. Returns the operand slot family.
    pub(super) fn push_icmp_operands(
        &mut self,
        id: InstId,
        pred: IntPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<SlotFamily> {
        let ty = self.value_type(lhs);
        let family = self.scalar_family(id, &ty)?;
        if matches!(family, SlotFamily::F32 | SlotFamily::F64) {
            return Err(self.malformed(id, "integer comparison on floating operands"));
        }
        let width = ty.int_width();
        let unsigned_rel = matches!(
            pred,
            IntPredicate::Ult | IntPredicate::Ule | IntPredicate::Ugt | IntPredicate::Uge
        );
        self.emit_value(lhs)?;
        if unsigned_rel {
            self.zeroize_small(width);
        }
        self.emit_value(rhs)?;
        if unsigned_rel {
            self.zeroize_small(width);
        }
        Ok(family)
    }

    /// Push both float-compare operands. Returns the operand slot family.
    pub(super) fn push_fcmp_operands(
        &mut self,
        id: InstId,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<SlotFamily> {
        let ty = self.value_type(lhs);
        let family = self.scalar_family(id, &ty)?;
        if !matches!(family, SlotFamily::F32 | SlotFamily::F64) {
            return Err(self.malformed(id, "float comparison on non-float operands"));
        }
        self.emit_value(lhs)?;
        self.emit_value(rhs)?;
        Ok(family)
    }

    /// Zero the extension bits of a canonical sub-32-bit value on the
    /// stack. i1 values are already 0/1; full widths pass through.
    pub(super) fn zeroize_small(&mut self, width: Option<u32>) {
        match width {
            Some(8) => self.em.op(OpCode::ConvI32U8),
            Some(16) => self.em.op(OpCode::ConvI32U16),
            _ => {}
        }
    }

    /// Push the address held in a scratch slot, plus a byte offset.
    pub(super) fn push_scratch_addr(&mut self, slot: u16, offset: u64) {
        self.em.chunk.emit_get_local(slot, self.em.line);
        if offset != 0 {
            self.em.push_i64(offset as i64);
            self.em.op(OpCode::AddI64);
        }
    }

    fn post_canonicalize(&mut self, op: BinOp, width: Option<u32>) {
        if !matches!(
            op,
            BinOp::Add
                | BinOp::Sub
                | BinOp::Mul
                | BinOp::Shl
                | BinOp::UDiv
                | BinOp::URem
                | BinOp::LShr
        ) {
            return;
        }
        match width {
            Some(1) if matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Shl) => {
                self.em.op(OpCode::PushOne);
                self.em.op(OpCode::AndI32);
            }
            Some(8) => self.em.op(OpCode::ConvI32I8),
            Some(16) => self.em.op(OpCode::ConvI32I16),
            _ => {}
        }
    }

    // === Vector paths ===

    fn emit_vector_binary(
        &mut self,
        id: InstId,
        op: BinOp,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        // No remainder in the host vocabulary; expand per lane.
        if matches!(op, BinOp::SRem | BinOp::URem | BinOp::FRem) {
            return self.lane_binary(id, op, lhs, rhs);
        }
        let TargetType::Vector(shape) = self.em.types.map(&ty)? else {
            return self.lane_binary(id, op, lhs, rhs);
        };
        if op.is_shift() {
            // The vector shift host takes one scalar amount for all lanes.
            let Some(amount) = self.uniform_shift_amount(rhs) else {
                return Err(self.unsupported(id));
            };
            let dest = self.buf_local(id);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(lhs)?;
            self.em.push_i32(amount as i32);
            let host = self.em.target.intern_host(
                format!("vec{}.{}.{}", shape.bits, op.name(), shape.elem.name()),
                vec![SigType::Ptr, SigType::Ptr, SigType::I32],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        let dest = self.buf_local(id);
        self.em.chunk.emit_local_addr(dest, self.em.line);
        self.emit_value(lhs)?;
        self.emit_value(rhs)?;
        let host = self.em.target.intern_host(
            format!("vec{}.{}.{}", shape.bits, op.name(), shape.elem.name()),
            vec![SigType::Ptr; 3],
            None,
        );
        self.em.chunk.write_op(OpCode::CallHost, self.em.line);
        self.em.chunk.write_u16(host, self.em.line);
        Ok(())
    }

    /// The lane count all lanes shift by, if `value` is a uniform constant.
    fn uniform_shift_amount(&self, value: ValueRef) -> Option<i64> {
        let ValueRef::Const(id) = value else {
            return None;
        };
        match self.em.module.constant(id) {
            Constant::Vector { elems, .. } => {
                let mut amount = None;
                for &elem in elems {
                    let lane = self.em.module.constant(elem).as_int()?;
                    match amount {
                        None => amount = Some(lane),
                        Some(seen) if seen == lane => {}
                        Some(_) => return None,
                    }
                }
                amount
            }
            Constant::Zero(_) => Some(0),
            _ => None,
        }
    }

    fn lane_binary(&mut self, id: InstId, op: BinOp, lhs: ValueRef, rhs: ValueRef) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        let IrType::Vector { elem, lanes } = &ty else {
            unreachable!("lane lowering on non-vector type")
        };
        let elem = (**elem).clone();
        let lanes = *lanes;
        let stride = self.em.types.size_of(&elem);
        let family = self.scalar_family(id, &elem)?;
        let opcode = binary_opcode(op, family).ok_or_else(|| {
            self.malformed(
                id,
                format!("'{}' applied to mismatched operand family", op.name()),
            )
        })?;
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let store = scalar_store_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let width = elem.int_width();
        let (zero_lhs, zero_rhs) = operand_zeroing(op);

        let dest = self.buf_local(id);
        self.emit_value(lhs)?;
        let a = self.scratch(0);
        self.em.chunk.emit_set_local(a, self.em.line);
        self.emit_value(rhs)?;
        let b = self.scratch(1);
        self.em.chunk.emit_set_local(b, self.em.line);
        for lane in 0..lanes {
            let offset = u64::from(lane) * stride;
            self.em.push_place_addr(Place::Local(dest), offset);
            self.push_scratch_addr(a, offset);
            self.em.op(load);
            if zero_lhs {
                self.zeroize_small(width);
            }
            self.push_scratch_addr(b, offset);
            self.em.op(load);
            if zero_rhs {
                self.zeroize_small(width);
            }
            self.em.op(opcode);
            // Mask lanes stay 0/1; stores truncate the wider forms anyway.
            if width == Some(1) && matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Shl)
            {
                self.em.op(OpCode::PushOne);
                self.em.op(OpCode::AndI32);
            }
            self.em.op(store);
        }
        Ok(())
    }

    fn emit_vector_icmp(
        &mut self,
        id: InstId,
        pred: IntPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<()> {
        let operand_ty = self.value_type(lhs);
        let dest = self.buf_local(id);
        if let TargetType::Vector(shape) = self.em.types.map(&operand_ty)? {
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(lhs)?;
            self.emit_value(rhs)?;
            let host = self.em.target.intern_host(
                format!("vec{}.{}.{}", shape.bits, pred.name(), shape.elem.name()),
                vec![SigType::Ptr; 3],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        let IrType::Vector { elem, lanes } = &operand_ty else {
            return Err(self.malformed(id, "vector compare on scalar operands"));
        };
        let elem = (**elem).clone();
        let lanes = *lanes;
        let stride = self.em.types.size_of(&elem);
        let family = self.scalar_family(id, &elem)?;
        if matches!(family, SlotFamily::F32 | SlotFamily::F64) {
            return Err(self.malformed(id, "integer comparison on floating operands"));
        }
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let width = elem.int_width();
        let unsigned_rel = matches!(
            pred,
            IntPredicate::Ult | IntPredicate::Ule | IntPredicate::Ugt | IntPredicate::Uge
        );

        self.emit_value(lhs)?;
        let a = self.scratch(0);
        self.em.chunk.emit_set_local(a, self.em.line);
        self.emit_value(rhs)?;
        let b = self.scratch(1);
        self.em.chunk.emit_set_local(b, self.em.line);
        for lane in 0..lanes {
            let offset = u64::from(lane) * stride;
            // Masks are byte lanes.
            self.em.push_place_addr(Place::Local(dest), u64::from(lane));
            self.push_scratch_addr(a, offset);
            self.em.op(load);
            if unsigned_rel {
                self.zeroize_small(width);
            }
            self.push_scratch_addr(b, offset);
            self.em.op(load);
            if unsigned_rel {
                self.zeroize_small(width);
            }
            self.em.op(icmp_value_op(pred, family));
            self.em.op(OpCode::StoreIndI8);
        }
        Ok(())
    }

    fn emit_vector_fcmp(
        &mut self,
        id: InstId,
        pred: FloatPredicate,
        lhs: ValueRef,
        rhs: ValueRef,
    ) -> Result<()> {
        let operand_ty = self.value_type(lhs);
        let dest = self.buf_local(id);
        if let TargetType::Vector(shape) = self.em.types.map(&operand_ty)? {
            // The host implements the full predicate, unordered included.
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(lhs)?;
            self.emit_value(rhs)?;
            let host = self.em.target.intern_host(
                format!("vec{}.{}.{}", shape.bits, pred.name(), shape.elem.name()),
                vec![SigType::Ptr; 3],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        let IrType::Vector { elem, lanes } = &operand_ty else {
            return Err(self.malformed(id, "vector compare on scalar operands"));
        };
        let elem = (**elem).clone();
        let lanes = *lanes;
        let stride = self.em.types.size_of(&elem);
        let family = self.scalar_family(id, &elem)?;
        if !matches!(family, SlotFamily::F32 | SlotFamily::F64) {
            return Err(self.malformed(id, "float comparison on non-float operands"));
        }
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let (ordered, negate) = pred.as_ordered();

        self.emit_value(lhs)?;
        let a = self.scratch(0);
        self.em.chunk.emit_set_local(a, self.em.line);
        self.emit_value(rhs)?;
        let b = self.scratch(1);
        self.em.chunk.emit_set_local(b, self.em.line);
        for lane in 0..lanes {
            let offset = u64::from(lane) * stride;
            self.em.push_place_addr(Place::Local(dest), u64::from(lane));
            self.push_scratch_addr(a, offset);
            self.em.op(load);
            self.push_scratch_addr(b, offset);
            self.em.op(load);
            self.em.op(fcmp_value_op(ordered, family));
            if negate {
                self.em.op(OpCode::Not);
            }
            self.em.op(OpCode::StoreIndI8);
        }
        Ok(())
    }

    fn lane_fneg(&mut self, id: InstId, ty: &IrType, operand: ValueRef) -> Result<()> {
        let IrType::Vector { elem, lanes } = ty else {
            unreachable!("lane lowering on non-vector type")
        };
        let elem = (**elem).clone();
        let lanes = *lanes;
        let stride = self.em.types.size_of(&elem);
        let neg = match self.scalar_family(id, &elem)? {
            SlotFamily::F32 => OpCode::NegF32,
            SlotFamily::F64 => OpCode::NegF64,
            _ => return Err(self.malformed(id, "fneg on a non-float value")),
        };
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let store = scalar_store_op(&elem).ok_or_else(|| self.unsupported(id))?;

        let dest = self.buf_local(id);
        self.emit_value(operand)?;
        let src = self.scratch(0);
        self.em.chunk.emit_set_local(src, self.em.line);
        for lane in 0..lanes {
            let offset = u64::from(lane) * stride;
            self.em.push_place_addr(Place::Local(dest), offset);
            self.push_scratch_addr(src, offset);
            self.em.op(load);
            self.em.op(neg);
            self.em.op(store);
        }
        Ok(())
    }

    fn emit_vector_select(
        &mut self,
        id: InstId,
        cond: ValueRef,
        if_true: ValueRef,
        if_false: ValueRef,
    ) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        let IrType::Vector { elem, lanes } = &ty else {
            return Err(self.malformed(id, "vector mask selecting a non-vector value"));
        };
        if let TargetType::Vector(shape) = self.em.types.map(&ty)? {
            let dest = self.buf_local(id);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(cond)?;
            self.emit_value(if_true)?;
            self.emit_value(if_false)?;
            let host = self.em.target.intern_host(
                format!("vec{}.select.{}", shape.bits, shape.elem.name()),
                vec![SigType::Ptr; 4],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        let elem = (**elem).clone();
        let lanes = *lanes;
        let stride = self.em.types.size_of(&elem);
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let store = scalar_store_op(&elem).ok_or_else(|| self.unsupported(id))?;

        let dest = self.buf_local(id);
        self.emit_value(cond)?;
        let mask = self.scratch(0);
        self.em.chunk.emit_set_local(mask, self.em.line);
        self.emit_value(if_true)?;
        let a = self.scratch(1);
        self.em.chunk.emit_set_local(a, self.em.line);
        self.emit_value(if_false)?;
        let b = self.scratch(2);
        self.em.chunk.emit_set_local(b, self.em.line);
        for lane in 0..lanes {
            let offset = u64::from(lane) * stride;
            self.em.push_place_addr(Place::Local(dest), offset);
            self.push_scratch_addr(mask, u64::from(lane));
            self.em.op(OpCode::LoadIndU8);
            let to_false = self.em.chunk.emit_jump(OpCode::JumpIfFalse, self.em.line);
            self.push_scratch_addr(a, offset);
            self.em.op(load);
            let to_end = self.em.chunk.emit_jump(OpCode::Jump, self.em.line);
            self.em.chunk.patch_jump(to_false);
            self.push_scratch_addr(b, offset);
            self.em.op(load);
            self.em.chunk.patch_jump(to_end);
            self.em.op(store);
        }
        Ok(())
    }
}

/// Whether `op` reads its operands unsigned, needing extension bits
/// cleared on sub-32-bit values: both for unsigned division, the shifted
/// value for a logical right shift.
fn operand_zeroing(op: BinOp) -> (bool, bool) {
    match op {
        BinOp::UDiv | BinOp::URem => (true, true),
        BinOp::LShr => (true, false),
        _ => (false, false),
    }
}

pub(super) fn binary_opcode(op: BinOp, family: SlotFamily) -> Option<OpCode> {
    use OpCode::*;
    Some(match family {
        SlotFamily::I32 => match op {
            BinOp::Add => AddI32,
            BinOp::Sub => SubI32,
            BinOp::Mul => MulI32,
            BinOp::SDiv => DivI32,
            BinOp::UDiv => DivU32,
            BinOp::SRem => RemI32,
            BinOp::URem => RemU32,
            BinOp::And => AndI32,
            BinOp::Or => OrI32,
            BinOp::Xor => XorI32,
            BinOp::Shl => ShlI32,
            BinOp::AShr => ShrI32,
            BinOp::LShr => UshrI32,
            _ => return None,
        },
        SlotFamily::I64 | SlotFamily::Ptr => match op {
            BinOp::Add => AddI64,
            BinOp::Sub => SubI64,
            BinOp::Mul => MulI64,
            BinOp::SDiv => DivI64,
            BinOp::UDiv => DivU64,
            BinOp::SRem => RemI64,
            BinOp::URem => RemU64,
            BinOp::And => AndI64,
            BinOp::Or => OrI64,
            BinOp::Xor => XorI64,
            BinOp::Shl => ShlI64,
            BinOp::AShr => ShrI64,
            BinOp::LShr => UshrI64,
            _ => return None,
        },
        SlotFamily::F32 => match op {
            BinOp::FAdd => AddF32,
            BinOp::FSub => SubF32,
            BinOp::FMul => MulF32,
            BinOp::FDiv => DivF32,
            BinOp::FRem => RemF32,
            _ => return None,
        },
        SlotFamily::F64 => match op {
            BinOp::FAdd => AddF64,
            BinOp::FSub => SubF64,
            BinOp::FMul => MulF64,
            BinOp::FDiv => DivF64,
            BinOp::FRem => RemF64,
            _ => return None,
        },
    })
}

pub(super) fn icmp_value_op(pred: IntPredicate, family: SlotFamily) -> OpCode {
    use OpCode::*;
    let wide = matches!(family, SlotFamily::I64 | SlotFamily::Ptr);
    match pred {
        IntPredicate::Eq => {
            if wide {
                EqI64
            } else {
                EqI32
            }
        }
        IntPredicate::Ne => {
            if wide {
                NeI64
            } else {
                NeI32
            }
        }
        IntPredicate::Slt => {
            if wide {
                LtI64
            } else {
                LtI32
            }
        }
        IntPredicate::Sle => {
            if wide {
                LeI64
            } else {
                LeI32
            }
        }
        IntPredicate::Sgt => {
            if wide {
                GtI64
            } else {
                GtI32
            }
        }
        IntPredicate::Sge => {
            if wide {
                GeI64
            } else {
                GeI32
            }
        }
        IntPredicate::Ult => {
            if wide {
                LtU64
            } else {
                LtU32
            }
        }
        IntPredicate::Ule => {
            if wide {
                LeU64
            } else {
                LeU32
            }
        }
        IntPredicate::Ugt => {
            if wide {
                GtU64
            } else {
                GtU32
            }
        }
        IntPredicate::Uge => {
            if wide {
                GeU64
            } else {
                GeU32
            }
        }
    }
}

pub(super) fn fcmp_value_op(pred: FloatPredicate, family: SlotFamily) -> OpCode {
    use OpCode::*;
    let double = matches!(family, SlotFamily::F64);
    match pred {
        FloatPredicate::Oeq => {
            if double {
                EqF64
            } else {
                EqF32
            }
        }
        FloatPredicate::One => {
            if double {
                NeF64
            } else {
                NeF32
            }
        }
        FloatPredicate::Olt => {
            if double {
                LtF64
            } else {
                LtF32
            }
        }
        FloatPredicate::Ole => {
            if double {
                LeF64
            } else {
                LeF32
            }
        }
        FloatPredicate::Ogt => {
            if double {
                GtF64
            } else {
                GtF32
            }
        }
        FloatPredicate::Oge => {
            if double {
                GeF64
            } else {
                GeF32
            }
        }
        _ => unreachable!("unordered predicates lower through their ordered complement"),
    }
}
