//! Call lowering: direct, indirect, and intrinsic.
//!
//! Direct calls resolve through the symbol table built by the declare
//! pass; calls through computed values pop a callable token. Names with
//! the `llvm.` prefix never become calls at all: each registered name
//! lowers through its registry strategy - a host-API forward, a
//! hand-written sequence, or nothing.

use ssalower_core::{CompileError, MethodHandle, Result};
use ssalower_ir::{BinOp, Callee, FnSig, InstId, InstKind, IrType, ValueRef};

use crate::bytecode::OpCode;
use crate::intrinsics::{CustomIntrinsic, IntrinsicStrategy};
use crate::target::SigType;
use crate::types::{ElemKind, SlotFamily, TargetType};
use crate::values::{Place, scalar_load_op, scalar_store_op};

use super::FunctionSelector;
use super::arith::binary_opcode;

/// How an unrolled reduction folds the next lane into the accumulator.
enum ReduceCombine {
    Op(OpCode),
    Host(u16),
}

impl FunctionSelector<'_> {
    /// Lower a call of any result shape.
    ///
    /// Scalar results are left on the stack, buffer results land in the
    /// instruction's buffer local, void calls leave nothing.
    pub(super) fn emit_call(&mut self, id: InstId) -> Result<()> {
        let InstKind::Call { callee, sig, args } = &self.func.inst(id).kind else {
            unreachable!("emit_call on a non-call instruction");
        };
        match callee {
            Callee::Func(f) => {
                let function = self.em.module.function(*f);
                if function.is_intrinsic() {
                    return self.emit_intrinsic(id, &function.name, args);
                }
                let method = self.em.symbols.lookup_function(*f).ok_or_else(|| {
                    self.malformed(id, format!("call to undeclared function '{}'", function.name))
                })?;
                self.emit_direct_call(id, method, sig, args)
            }
            Callee::Value(value) => self.emit_indirect_call(id, *value, sig, args),
        }
    }

    fn emit_direct_call(
        &mut self,
        id: InstId,
        method: MethodHandle,
        sig: &FnSig,
        args: &[ValueRef],
    ) -> Result<()> {
        for &arg in args {
            self.emit_value(arg)?;
        }
        let site = self.em.types.method_sig(sig)?;
        let site = self.em.target.intern_signature(site);
        self.em.chunk.write_op(OpCode::Call, self.em.line);
        self.em.chunk.write_u16(method.index() as u16, self.em.line);
        self.em.chunk.write_u16(site, self.em.line);
        self.finish_call_result(id)
    }

    fn emit_indirect_call(
        &mut self,
        id: InstId,
        callee: ValueRef,
        sig: &FnSig,
        args: &[ValueRef],
    ) -> Result<()> {
        for &arg in args {
            self.emit_value(arg)?;
        }
        self.emit_value(callee)?;
        let site = self.em.types.method_sig(sig)?;
        let site = self.em.target.intern_signature(site);
        self.em.chunk.write_op(OpCode::CallIndirect, self.em.line);
        self.em.chunk.write_u16(site, self.em.line);
        self.finish_call_result(id)
    }

    /// A buffer return arrives as the address of a temporary owned by
    /// the callee's frame teardown; copy it out before anything else can
    /// reuse that storage. Scalar returns are already where they belong.
    fn finish_call_result(&mut self, id: InstId) -> Result<()> {
        let inst = self.func.inst(id);
        if !inst.has_result() {
            return Ok(());
        }
        let ty = inst.ty.clone();
        if !self.em.types.map(&ty)?.is_buffer() {
            return Ok(());
        }
        let size = self.em.types.size_of(&ty) as i64;
        let temp = self.scratch(0);
        self.em.chunk.emit_set_local(temp, self.em.line);
        let dest = self.buf_local(id);
        self.em.chunk.emit_local_addr(dest, self.em.line);
        self.em.chunk.emit_get_local(temp, self.em.line);
        self.em.push_i64(size);
        self.em.op(OpCode::MemCopy);
        Ok(())
    }

    // === Intrinsics ===

    fn emit_intrinsic(&mut self, id: InstId, name: &str, args: &[ValueRef]) -> Result<()> {
        let strategy = self
            .intrinsics
            .lookup(name)
            .ok_or_else(|| CompileError::unsupported_intrinsic(name, self.func.name.clone()))?;
        match strategy {
            IntrinsicStrategy::NoOp => Ok(()),
            IntrinsicStrategy::Forward(base) => self.emit_forward(id, base, args),
            IntrinsicStrategy::Custom(custom) => match custom {
                CustomIntrinsic::MemCpy => self.emit_mem_copy(id, args),
                CustomIntrinsic::MemSet => self.emit_mem_fill(id, args),
                CustomIntrinsic::USubSat => self.emit_usub_sat(id, args),
                CustomIntrinsic::StackSave => {
                    self.em.op(OpCode::PushNull);
                    Ok(())
                }
                CustomIntrinsic::VaStart => self.emit_va_start(id, args),
                CustomIntrinsic::DbgDeclare => self.emit_dbg_declare(id, args),
            },
        }
    }

    /// Forward to an equivalent host API. Scalar shapes call a
    /// `math.{base}.{suffix}` builtin on slot values; SIMD-mapped vector
    /// shapes call into the `vec{bits}.{base}.{elem}` family; vectors
    /// without a SIMD mapping expand lane by lane.
    fn emit_forward(&mut self, id: InstId, base: &'static str, args: &[ValueRef]) -> Result<()> {
        // llvm.abs carries a poison-behavior flag the host call does not take.
        let args = match base {
            "abs" => &args[..args.len().min(1)],
            _ => args,
        };
        let ret = self.func.inst(id).ty.clone();
        if let IrType::Vector { .. } = ret {
            return self.emit_vector_forward(id, base, args, &ret);
        }
        if let Some(vector) = args
            .iter()
            .copied()
            .find(|&arg| self.value_type(arg).is_vector())
        {
            return self.emit_reduce(id, base, vector, &ret);
        }

        let suffix = self.scalar_suffix(id, &ret)?;
        let mut params = Vec::with_capacity(args.len());
        for &arg in args {
            self.emit_value(arg)?;
            params.push(self.em.types.sig_type(&self.value_type(arg))?);
        }
        let ret_sig = self.em.types.sig_type(&ret)?;
        let host =
            self.em
                .target
                .intern_host(format!("math.{base}.{suffix}"), params, Some(ret_sig));
        self.em.chunk.write_op(OpCode::CallHost, self.em.line);
        self.em.chunk.write_u16(host, self.em.line);
        self.narrow_small(ret.int_width());
        Ok(())
    }

    fn emit_vector_forward(
        &mut self,
        id: InstId,
        base: &'static str,
        args: &[ValueRef],
        ret: &IrType,
    ) -> Result<()> {
        if let TargetType::Vector(shape) = self.em.types.map(ret)? {
            let dest = self.buf_local(id);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            for &arg in args {
                self.emit_value(arg)?;
            }
            let host = self.em.target.intern_host(
                format!("vec{}.{}.{}", shape.bits, base, shape.elem.name()),
                vec![SigType::Ptr; args.len() + 1],
                None,
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            return Ok(());
        }
        self.lane_forward(id, base, args, ret)
    }

    /// Per-lane expansion of an elementwise forward: each lane loads its
    /// operands, calls the scalar host, and stores the result.
    fn lane_forward(
        &mut self,
        id: InstId,
        base: &'static str,
        args: &[ValueRef],
        ret: &IrType,
    ) -> Result<()> {
        let IrType::Vector { elem, lanes } = ret else {
            unreachable!("lane lowering on non-vector type")
        };
        let elem = (**elem).clone();
        let lanes = *lanes;
        if args.len() > self.scratch_slots.len() {
            return Err(self.unsupported(id));
        }
        let stride = self.em.types.size_of(&elem);
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let store = scalar_store_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let suffix = self.scalar_suffix(id, &elem)?;
        let sig = self.em.types.sig_type(&elem)?;
        let host = self.em.target.intern_host(
            format!("math.{base}.{suffix}"),
            vec![sig; args.len()],
            Some(sig),
        );

        let dest = self.buf_local(id);
        let mut srcs = Vec::with_capacity(args.len());
        for (n, &arg) in args.iter().enumerate() {
            self.emit_value(arg)?;
            let slot = self.scratch(n);
            self.em.chunk.emit_set_local(slot, self.em.line);
            srcs.push(slot);
        }
        for lane in 0..u64::from(lanes) {
            let offset = lane * stride;
            self.em.push_place_addr(Place::Local(dest), offset);
            for &src in &srcs {
                self.push_scratch_addr(src, offset);
                self.em.op(load);
            }
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            // The store truncates wider forms on the way out.
            self.em.op(store);
        }
        Ok(())
    }

    /// Horizontal reduction over one vector operand.
    fn emit_reduce(
        &mut self,
        id: InstId,
        base: &'static str,
        vector: ValueRef,
        ret: &IrType,
    ) -> Result<()> {
        let vec_ty = self.value_type(vector);
        if let TargetType::Vector(shape) = self.em.types.map(&vec_ty)? {
            self.emit_value(vector)?;
            let ret_sig = self.em.types.sig_type(ret)?;
            let host = self.em.target.intern_host(
                format!("vec{}.{}.{}", shape.bits, base, shape.elem.name()),
                vec![SigType::Ptr],
                Some(ret_sig),
            );
            self.em.chunk.write_op(OpCode::CallHost, self.em.line);
            self.em.chunk.write_u16(host, self.em.line);
            self.narrow_small(ret.int_width());
            return Ok(());
        }
        self.lane_reduce(id, base, vector, ret)
    }

    /// Unrolled reduction for vectors without a SIMD mapping: lane zero
    /// seeds the accumulator on the stack, later lanes fold in.
    fn lane_reduce(
        &mut self,
        id: InstId,
        base: &'static str,
        vector: ValueRef,
        ret: &IrType,
    ) -> Result<()> {
        let IrType::Vector { elem, lanes } = self.value_type(vector) else {
            return Err(self.malformed(id, "reduction over a non-vector value"));
        };
        let elem = *elem;
        let stride = self.em.types.size_of(&elem);
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        let combine = self.reduce_combine(id, base, &elem)?;

        self.emit_value(vector)?;
        let src = self.scratch(0);
        self.em.chunk.emit_set_local(src, self.em.line);
        self.push_scratch_addr(src, 0);
        self.em.op(load);
        for lane in 1..u64::from(lanes) {
            self.push_scratch_addr(src, lane * stride);
            self.em.op(load);
            match combine {
                ReduceCombine::Op(op) => self.em.op(op),
                ReduceCombine::Host(host) => {
                    self.em.chunk.write_op(OpCode::CallHost, self.em.line);
                    self.em.chunk.write_u16(host, self.em.line);
                }
            }
        }
        self.narrow_small(ret.int_width());
        Ok(())
    }

    fn reduce_combine(
        &mut self,
        id: InstId,
        base: &'static str,
        elem: &IrType,
    ) -> Result<ReduceCombine> {
        let tail = base.rsplit_once('.').map_or(base, |(_, tail)| tail);
        let family = self.scalar_family(id, elem)?;
        let op = match tail {
            "add" => Some(BinOp::Add),
            "mul" => Some(BinOp::Mul),
            "and" => Some(BinOp::And),
            "or" => Some(BinOp::Or),
            "xor" => Some(BinOp::Xor),
            _ => None,
        };
        if let Some(op) = op {
            let opcode = binary_opcode(op, family).ok_or_else(|| self.unsupported(id))?;
            return Ok(ReduceCombine::Op(opcode));
        }
        let suffix = self.scalar_suffix(id, elem)?;
        let sig = self.em.types.sig_type(elem)?;
        let host =
            self.em
                .target
                .intern_host(format!("math.{tail}.{suffix}"), vec![sig; 2], Some(sig));
        Ok(ReduceCombine::Host(host))
    }

    /// Host-name suffix for a scalar type. The 1-bit integer computes in
    /// i32 slots and borrows its name.
    fn scalar_suffix(&mut self, id: InstId, ty: &IrType) -> Result<&'static str> {
        if let Some(kind) = ElemKind::of(ty) {
            return Ok(kind.name());
        }
        Ok(match self.scalar_family(id, ty)? {
            SlotFamily::I32 => "i32",
            SlotFamily::I64 | SlotFamily::Ptr => "i64",
            SlotFamily::F32 => "f32",
            SlotFamily::F64 => "f64",
        })
    }

    // === Custom sequences ===

    /// `llvm.memcpy` and `llvm.memmove`. `MemCopy` copies as if through
    /// a temporary, so both share it; the volatile flag changes nothing
    /// here.
    fn emit_mem_copy(&mut self, id: InstId, args: &[ValueRef]) -> Result<()> {
        let &[dest, src, len, ..] = args else {
            return Err(self.malformed(id, "bulk copy takes destination, source, and length"));
        };
        self.emit_value(dest)?;
        self.emit_value(src)?;
        self.push_len_as_u64(len)?;
        self.em.op(OpCode::MemCopy);
        Ok(())
    }

    /// `llvm.memset` lowers to `MemFill`.
    fn emit_mem_fill(&mut self, id: InstId, args: &[ValueRef]) -> Result<()> {
        let &[dest, value, len, ..] = args else {
            return Err(self.malformed(id, "bulk fill takes destination, value, and length"));
        };
        self.emit_value(dest)?;
        self.emit_value(value)?;
        self.push_len_as_u64(len)?;
        self.em.op(OpCode::MemFill);
        Ok(())
    }

    /// Push a byte count widened to 64 bits. Counts are unsigned, so
    /// narrow ones zero-extend.
    fn push_len_as_u64(&mut self, len: ValueRef) -> Result<()> {
        self.emit_value(len)?;
        if self.value_type(len).int_width() != Some(64) {
            self.em.op(OpCode::ConvU32I64);
        }
        Ok(())
    }

    /// `llvm.usub.sat`: `a - b` clamped at zero, computed branch-free as
    /// `(a - b) * (a >= b)`.
    fn emit_usub_sat(&mut self, id: InstId, args: &[ValueRef]) -> Result<()> {
        let &[lhs, rhs] = args else {
            return Err(self.malformed(id, "saturating subtract takes two operands"));
        };
        let ty = self.func.inst(id).ty.clone();
        let family = self.scalar_family(id, &ty)?;
        if !matches!(family, SlotFamily::I32 | SlotFamily::I64) {
            return Err(self.malformed(id, "saturating subtract on a non-integer value"));
        }
        let width = ty.int_width();
        self.emit_value(lhs)?;
        self.emit_value(rhs)?;
        // Park only after both operands are emitted; a deferred operand
        // may claim the scratch slots while it is being computed.
        let b = self.scratch(1);
        self.em.chunk.emit_set_local(b, self.em.line);
        let a = self.scratch(0);
        self.em.chunk.emit_set_local(a, self.em.line);

        self.em.chunk.emit_get_local(a, self.em.line);
        self.em.chunk.emit_get_local(b, self.em.line);
        if family == SlotFamily::I64 {
            self.em.op(OpCode::SubI64);
        } else {
            self.em.op(OpCode::SubI32);
        }
        self.em.chunk.emit_get_local(a, self.em.line);
        self.zeroize_small(width);
        self.em.chunk.emit_get_local(b, self.em.line);
        self.zeroize_small(width);
        if family == SlotFamily::I64 {
            self.em.op(OpCode::GeU64);
            self.em.op(OpCode::ConvI32I64);
            self.em.op(OpCode::MulI64);
        } else {
            self.em.op(OpCode::GeU32);
            self.em.op(OpCode::MulI32);
            self.narrow_small(width);
        }
        Ok(())
    }

    /// `llvm.va_start`: hand the argument-list cursor to the runtime.
    fn emit_va_start(&mut self, id: InstId, args: &[ValueRef]) -> Result<()> {
        let &[list, ..] = args else {
            return Err(self.malformed(id, "va_start takes the argument-list pointer"));
        };
        self.emit_value(list)?;
        let host = self
            .em
            .target
            .intern_host("rt.va_start", vec![SigType::Ptr], None);
        self.em.chunk.write_op(OpCode::CallHost, self.em.line);
        self.em.chunk.write_u16(host, self.em.line);
        Ok(())
    }

    /// `llvm.dbg.declare`: report the variable's storage to the symbol
    /// sink. Emits no code.
    fn emit_dbg_declare(&mut self, _id: InstId, args: &[ValueRef]) -> Result<()> {
        let Some(&ValueRef::Inst(target)) = args.first() else {
            return Ok(());
        };
        let inst = self.func.inst(target);
        let Some(name) = inst.name.clone() else {
            return Ok(());
        };
        let local = match &inst.kind {
            InstKind::Alloca {
                count: ValueRef::Const(_),
                ..
            } => self.alloca_buffer(target)?,
            _ if self.em.types.map(&inst.ty)?.is_buffer() => self.buf_local(target),
            _ if self.placement.on_stack(target) => return Ok(()),
            _ => self.slot(target),
        };
        self.sink.local_name(self.method, local, &name);
        Ok(())
    }

    /// Re-narrow a sub-32-bit integer to canonical form; wider widths
    /// and floats pass through.
    pub(super) fn narrow_small(&mut self, width: Option<u32>) {
        match width {
            Some(1) => {
                self.em.op(OpCode::PushOne);
                self.em.op(OpCode::AndI32);
            }
            Some(8) => self.em.op(OpCode::ConvI32I8),
            Some(16) => self.em.op(OpCode::ConvI32I16),
            _ => {}
        }
    }
}
