//! `shufflevector` lowering.
//!
//! Three shapes, cheapest first: a broadcast of one scalar (the
//! insert-into-undef idiom under an all-zero mask), a straight
//! concatenation of both sources (identity mask), and the general case,
//! which copies the picked lanes one at a time. Poison lanes
//! (`u32::MAX`) emit nothing and leave their bytes undefined.

use ssalower_core::Result;
use ssalower_ir::{Constant, InstId, InstKind, IrType, ValueRef};

use crate::bytecode::OpCode;
use crate::target::SigType;
use crate::types::TargetType;
use crate::values::{Place, scalar_load_op, scalar_store_op};

use super::FunctionSelector;

impl FunctionSelector<'_> {
    pub(super) fn emit_shuffle(
        &mut self,
        id: InstId,
        a: ValueRef,
        b: ValueRef,
        mask: &[u32],
    ) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        let IrType::Vector { elem, lanes } = &ty else {
            return Err(self.malformed(id, "shufflevector on a non-vector value"));
        };
        let elem = (**elem).clone();
        let lanes = *lanes;
        if mask.len() != lanes as usize {
            return Err(self.malformed(id, "shuffle mask length does not match the result"));
        }
        let IrType::Vector {
            lanes: src_lanes, ..
        } = self.value_type(a)
        else {
            return Err(self.malformed(id, "shufflevector on non-vector sources"));
        };

        if mask.iter().all(|&pick| pick == 0) {
            if let Some(scalar) = self.splat_scalar(a) {
                if let TargetType::Vector(shape) = self.em.types.map(&ty)? {
                    let dest = self.buf_local(id);
                    self.em.chunk.emit_local_addr(dest, self.em.line);
                    self.emit_value(scalar)?;
                    let sig = self.em.types.sig_type(&elem)?;
                    let host = self.em.target.intern_host(
                        format!("vec{}.splat.{}", shape.bits, shape.elem.name()),
                        vec![SigType::Ptr, sig],
                        None,
                    );
                    self.em.chunk.write_op(OpCode::CallHost, self.em.line);
                    self.em.chunk.write_u16(host, self.em.line);
                    return Ok(());
                }
            }
        }

        let concat =
            lanes == 2 * src_lanes && mask.iter().enumerate().all(|(k, &pick)| pick as usize == k);
        if concat {
            return self.emit_concat(id, a, b, &ty);
        }

        self.emit_general_shuffle(id, a, b, mask, &elem, src_lanes)
    }

    /// The broadcast scalar, if `value` is an insert of lane zero into
    /// an undef (or zero) base. A deferred scalar is not reusable here -
    /// its one emission belongs to the insert - so it falls through to
    /// the general lowering, which reads the materialized lane instead.
    fn splat_scalar(&self, value: ValueRef) -> Option<ValueRef> {
        let ValueRef::Inst(inst) = value else {
            return None;
        };
        let InstKind::InsertElement {
            vector,
            elem,
            index,
        } = &self.func.inst(inst).kind
        else {
            return None;
        };
        let ValueRef::Const(base) = vector else {
            return None;
        };
        if !matches!(
            self.em.module.constant(*base),
            Constant::Undef(_) | Constant::Zero(_)
        ) {
            return None;
        }
        let ValueRef::Const(index) = index else {
            return None;
        };
        if self.em.module.constant(*index).as_int() != Some(0) {
            return None;
        }
        if let ValueRef::Inst(scalar) = elem {
            if self.placement.on_stack(*scalar) {
                return None;
            }
        }
        Some(*elem)
    }

    /// Both sources laid end to end. SIMD shapes get the two-argument
    /// construct host call; buffer shapes copy the halves.
    fn emit_concat(&mut self, id: InstId, a: ValueRef, b: ValueRef, ty: &IrType) -> Result<()> {
        if let TargetType::Vector(shape) = self.em.types.map(ty)? {
            let dest = self.buf_local(id);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(a)?;
            self.emit_value(b)?;
            let host = self.em.target.intern_host(
                format!("vec{}.concat.{}", shape.bits, shape.elem.name()),
                vec![SigType::Ptr; 3],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        let half = (self.em.types.size_of(ty) / 2) as i64;
        let dest = self.buf_local(id);
        self.em.chunk.emit_local_addr(dest, self.em.line);
        self.emit_value(a)?;
        self.em.push_i64(half);
        self.em.op(OpCode::MemCopy);
        self.em.push_place_addr(Place::Local(dest), half as u64);
        self.emit_value(b)?;
        self.em.push_i64(half);
        self.em.op(OpCode::MemCopy);
        Ok(())
    }

    fn emit_general_shuffle(
        &mut self,
        id: InstId,
        a: ValueRef,
        b: ValueRef,
        mask: &[u32],
        elem: &IrType,
        src_lanes: u32,
    ) -> Result<()> {
        let stride = self.em.types.size_of(elem);
        let load = scalar_load_op(elem).ok_or_else(|| self.unsupported(id))?;
        let store = scalar_store_op(elem).ok_or_else(|| self.unsupported(id))?;

        let dest = self.buf_local(id);
        self.emit_value(a)?;
        let from_a = self.scratch(0);
        self.em.chunk.emit_set_local(from_a, self.em.line);
        self.emit_value(b)?;
        let from_b = self.scratch(1);
        self.em.chunk.emit_set_local(from_b, self.em.line);
        for (lane, &pick) in mask.iter().enumerate() {
            if pick == u32::MAX {
                continue;
            }
            let (src, index) = if pick < src_lanes {
                (from_a, pick)
            } else if pick < 2 * src_lanes {
                (from_b, pick - src_lanes)
            } else {
                return Err(self.malformed(id, format!("shuffle mask lane {pick} is out of range")));
            };
            self.em
                .push_place_addr(Place::Local(dest), lane as u64 * stride);
            self.push_scratch_addr(src, u64::from(index) * stride);
            self.em.op(load);
            self.em.op(store);
        }
        Ok(())
    }
}
