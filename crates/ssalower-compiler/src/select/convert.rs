//! Scalar and vector conversions.
//!
//! Scalar rules assume the canonical slot form: sub-32-bit integers are
//! held sign-extended in i32 slots, i1 as 0 or 1, and every i32-family
//! slot is zero-extended to its full 64 bits. Many conversions therefore
//! cost nothing; the rest re-narrow, re-zero, or widen around the typed
//! conversion opcodes. Bitcasts between buffer shapes move bytes.

use ssalower_core::Result;
use ssalower_ir::{ConvOp, InstId, IrType, ValueRef};

use crate::bytecode::OpCode;
use crate::target::SigType;
use crate::types::TargetType;
use crate::values::{Place, scalar_load_op, scalar_store_op};

use super::FunctionSelector;

impl FunctionSelector<'_> {
    pub(super) fn emit_convert(&mut self, id: InstId, op: ConvOp, operand: ValueRef) -> Result<()> {
        let src = self.value_type(operand);
        let dst = self.func.inst(id).ty.clone();
        if op == ConvOp::Bitcast {
            return self.emit_bitcast(id, operand, &src, &dst);
        }
        if matches!(src, IrType::Vector { .. }) || matches!(dst, IrType::Vector { .. }) {
            return self.emit_vector_convert(id, op, operand, &src, &dst);
        }
        self.emit_value(operand)?;
        self.scalar_convert(id, op, &src, &dst)
    }

    /// Emit the conversion opcodes for `op` against the value already on
    /// the stack.
    fn scalar_convert(&mut self, id: InstId, op: ConvOp, src: &IrType, dst: &IrType) -> Result<()> {
        let src_w = src.int_width();
        let dst_w = dst.int_width();
        let bad = |sel: &Self| {
            sel.malformed(id, format!("{} from {src} to {dst}", op.name()))
        };
        match op {
            ConvOp::Trunc => {
                if src_w.is_none() || dst_w.is_none() {
                    return Err(bad(self));
                }
                if src_w == Some(64) {
                    self.em.op(OpCode::ConvI64I32);
                }
                self.narrow_small(dst_w);
            }
            ConvOp::ZExt => {
                if src_w.is_none() || dst_w.is_none() {
                    return Err(bad(self));
                }
                self.zeroize_small(src_w);
                // An i1 is 0 or 1 through all 64 slot bits already.
                if dst_w == Some(64) && src_w != Some(1) {
                    self.em.op(OpCode::ConvU32I64);
                }
            }
            ConvOp::SExt => {
                if src_w.is_none() || dst_w.is_none() {
                    return Err(bad(self));
                }
                if src_w == Some(1) {
                    self.em.op(OpCode::NegI32);
                }
                if dst_w == Some(64) {
                    self.em.op(OpCode::ConvI32I64);
                }
            }
            ConvOp::FpTrunc => {
                if !(matches!(src, IrType::Double) && matches!(dst, IrType::Float)) {
                    return Err(bad(self));
                }
                self.em.op(OpCode::ConvF64F32);
            }
            ConvOp::FpExt => {
                if !(matches!(src, IrType::Float) && matches!(dst, IrType::Double)) {
                    return Err(bad(self));
                }
                self.em.op(OpCode::ConvF32F64);
            }
            ConvOp::FpToSi | ConvOp::FpToUi => {
                if !matches!(src, IrType::Float | IrType::Double) || dst_w.is_none() {
                    return Err(bad(self));
                }
                let unsigned = op == ConvOp::FpToUi;
                let wide = dst_w == Some(64);
                self.em.op(match (matches!(src, IrType::Double), unsigned, wide) {
                    (false, false, false) => OpCode::ConvF32I32,
                    (false, false, true) => OpCode::ConvF32I64,
                    (false, true, false) => OpCode::ConvF32U32,
                    (false, true, true) => OpCode::ConvF32U64,
                    (true, false, false) => OpCode::ConvF64I32,
                    (true, false, true) => OpCode::ConvF64I64,
                    (true, true, false) => OpCode::ConvF64U32,
                    (true, true, true) => OpCode::ConvF64U64,
                });
                if !wide {
                    self.narrow_small(dst_w);
                }
            }
            ConvOp::SiToFp | ConvOp::UiToFp => {
                if src_w.is_none() || !matches!(dst, IrType::Float | IrType::Double) {
                    return Err(bad(self));
                }
                let unsigned = op == ConvOp::UiToFp;
                if unsigned {
                    self.zeroize_small(src_w);
                }
                let to64 = matches!(dst, IrType::Double);
                self.em.op(match (src_w == Some(64), unsigned, to64) {
                    (false, false, false) => OpCode::ConvI32F32,
                    (false, false, true) => OpCode::ConvI32F64,
                    (false, true, false) => OpCode::ConvU32F32,
                    (false, true, true) => OpCode::ConvU32F64,
                    (true, false, false) => OpCode::ConvI64F32,
                    (true, false, true) => OpCode::ConvI64F64,
                    (true, true, false) => OpCode::ConvU64F32,
                    (true, true, true) => OpCode::ConvU64F64,
                });
            }
            ConvOp::PtrToInt => {
                if !matches!(src, IrType::Ptr) || dst_w.is_none() {
                    return Err(bad(self));
                }
                if dst_w != Some(64) {
                    self.em.op(OpCode::ConvI64I32);
                    self.narrow_small(dst_w);
                }
            }
            ConvOp::IntToPtr => {
                if src_w.is_none() || !matches!(dst, IrType::Ptr) {
                    return Err(bad(self));
                }
                if src_w != Some(64) {
                    self.zeroize_small(src_w);
                    self.em.op(OpCode::ConvU32I64);
                }
            }
            ConvOp::Bitcast => unreachable!("bitcast takes its own path"),
        }
        Ok(())
    }

    /// Reinterpret bits. Equal-width scalar pairs use the register
    /// bitcasts; anything living in a buffer moves bytes through memory.
    fn emit_bitcast(
        &mut self,
        id: InstId,
        operand: ValueRef,
        src: &IrType,
        dst: &IrType,
    ) -> Result<()> {
        let src_t = self.em.types.map(src)?;
        let dst_t = self.em.types.map(dst)?;
        if self.em.types.bits_of(src) != self.em.types.bits_of(dst) {
            return Err(self.malformed(
                id,
                format!("bitcast between {src} and {dst} of different widths"),
            ));
        }
        match (src_t.is_buffer(), dst_t.is_buffer()) {
            (false, false) => {
                self.emit_value(operand)?;
                let cast = match (src_t, dst_t) {
                    (TargetType::I32, TargetType::F32) => Some(OpCode::BitcastI32F32),
                    (TargetType::F32, TargetType::I32) => Some(OpCode::BitcastF32I32),
                    (TargetType::I64, TargetType::F64) => Some(OpCode::BitcastI64F64),
                    (TargetType::F64, TargetType::I64) => Some(OpCode::BitcastF64I64),
                    (TargetType::Ptr, TargetType::I64) | (TargetType::I64, TargetType::Ptr) => None,
                    (a, b) if a == b => None,
                    _ => {
                        return Err(
                            self.malformed(id, format!("no scalar bitcast from {src} to {dst}"))
                        );
                    }
                };
                if let Some(cast) = cast {
                    self.em.op(cast);
                }
            }
            (true, true) => {
                let size = self.em.types.size_of(dst) as i64;
                let dest = self.buf_local(id);
                self.em.chunk.emit_local_addr(dest, self.em.line);
                self.emit_value(operand)?;
                self.em.push_i64(size);
                self.em.op(OpCode::MemCopy);
            }
            (false, true) => {
                // Scalar reinterpreted as a buffer shape: store it there.
                let store = scalar_store_op(src).ok_or_else(|| self.unsupported(id))?;
                let dest = self.buf_local(id);
                self.em.chunk.emit_local_addr(dest, self.em.line);
                self.emit_value(operand)?;
                self.em.op(store);
            }
            (true, false) => {
                let load = scalar_load_op(dst).ok_or_else(|| self.unsupported(id))?;
                self.emit_value(operand)?;
                self.em.op(load);
            }
        }
        Ok(())
    }

    /// Lane-count-preserving vector conversion. When both sides map onto
    /// SIMD buckets this is one host call; otherwise each lane converts
    /// through the scalar rules.
    fn emit_vector_convert(
        &mut self,
        id: InstId,
        op: ConvOp,
        operand: ValueRef,
        src: &IrType,
        dst: &IrType,
    ) -> Result<()> {
        if let (TargetType::Vector(from), TargetType::Vector(to)) =
            (self.em.types.map(src)?, self.em.types.map(dst)?)
        {
            let dest = self.buf_local(id);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(operand)?;
            let host = self.em.target.intern_host(
                format!(
                    "vec{}.{}.{}.{}",
                    from.bits,
                    op.name(),
                    from.elem.name(),
                    to.elem.name()
                ),
                vec![SigType::Ptr; 2],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        self.lane_convert(id, op, operand, src, dst)
    }

    fn lane_convert(
        &mut self,
        id: InstId,
        op: ConvOp,
        operand: ValueRef,
        src: &IrType,
        dst: &IrType,
    ) -> Result<()> {
        let (
            IrType::Vector { elem: src_elem, lanes },
            IrType::Vector {
                elem: dst_elem,
                lanes: dst_lanes,
            },
        ) = (src, dst)
        else {
            return Err(self.malformed(id, "conversion mixes vector and scalar shapes"));
        };
        if lanes != dst_lanes {
            return Err(self.malformed(id, "conversion changes the lane count"));
        }
        let src_elem = (**src_elem).clone();
        let dst_elem = (**dst_elem).clone();
        let lanes = *lanes;
        let src_stride = self.em.types.size_of(&src_elem);
        let dst_stride = self.em.types.size_of(&dst_elem);
        let load = scalar_load_op(&src_elem).ok_or_else(|| self.unsupported(id))?;
        let store = scalar_store_op(&dst_elem).ok_or_else(|| self.unsupported(id))?;

        let dest = self.buf_local(id);
        self.emit_value(operand)?;
        let from = self.scratch(0);
        self.em.chunk.emit_set_local(from, self.em.line);
        for lane in 0..u64::from(lanes) {
            self.em
                .push_place_addr(Place::Local(dest), lane * dst_stride);
            self.push_scratch_addr(from, lane * src_stride);
            self.em.op(load);
            self.scalar_convert(id, op, &src_elem, &dst_elem)?;
            self.em.op(store);
        }
        Ok(())
    }
}
