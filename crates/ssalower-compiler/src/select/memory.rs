//! Loads, stores, address computation, stack allocation, and single-lane
//! vector access.
//!
//! Scalar accesses go through the typed indirect opcodes. Types that live
//! in buffers move with `MemCopy`. Address computations fold every
//! constant step into the running offset and add it once at the end, so a
//! chain of constant indices costs a single `AddI64`.

use ssalower_core::Result;
use ssalower_ir::{InstId, InstKind, IrType, ValueRef};

use crate::bytecode::OpCode;
use crate::values::{scalar_load_op, scalar_store_op};

use super::FunctionSelector;

impl FunctionSelector<'_> {
    /// Read through a pointer. Scalars push the loaded value; buffer
    /// types copy the pointee into the instruction's own buffer.
    pub(super) fn emit_load(&mut self, id: InstId, ptr: ValueRef) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        if self.em.types.map(&ty)?.is_buffer() {
            let size = self.em.types.size_of(&ty) as i64;
            let dest = self.buf_local(id);
            self.em.chunk.emit_local_addr(dest, self.em.line);
            self.emit_value(ptr)?;
            self.em.push_i64(size);
            self.em.op(OpCode::MemCopy);
            return Ok(());
        }
        self.emit_value(ptr)?;
        let load = scalar_load_op(&ty).ok_or_else(|| self.unsupported(id))?;
        self.em.op(load);
        Ok(())
    }

    /// Write through a pointer. The indirect store opcodes pop the value
    /// and then the address, so the address goes on first.
    pub(super) fn emit_store(&mut self, id: InstId, value: ValueRef, ptr: ValueRef) -> Result<()> {
        let ty = self.value_type(value);
        if self.em.types.map(&ty)?.is_buffer() {
            let size = self.em.types.size_of(&ty) as i64;
            self.emit_value(ptr)?;
            self.emit_value(value)?;
            self.em.push_i64(size);
            self.em.op(OpCode::MemCopy);
            return Ok(());
        }
        self.emit_value(ptr)?;
        self.emit_value(value)?;
        let store = scalar_store_op(&ty).ok_or_else(|| self.unsupported(id))?;
        self.em.op(store);
        Ok(())
    }

    /// Address computation. Walks `source_ty` the same way constant
    /// folding does in [`ValueEmitter`](crate::values::ValueEmitter):
    /// the first index scales by the size of the source type itself,
    /// later indices step into aggregates.
    pub(super) fn emit_gep(
        &mut self,
        id: InstId,
        base: ValueRef,
        source_ty: &IrType,
        indices: &[ValueRef],
    ) -> Result<()> {
        self.emit_value(base)?;
        let mut acc = 0i64;
        let mut cur = source_ty.clone();
        for (position, &index) in indices.iter().enumerate() {
            if position == 0 {
                let stride = self.em.types.size_of(source_ty) as i64;
                self.gep_index(index, stride, &mut acc)?;
                continue;
            }
            match &cur {
                IrType::Array { elem, .. } | IrType::Vector { elem, .. } => {
                    let stride = self.em.types.size_of(elem) as i64;
                    let next = (**elem).clone();
                    self.gep_index(index, stride, &mut acc)?;
                    cur = next;
                }
                IrType::Struct { fields, packed } => {
                    // Field steps must be constant; the layout depends on them.
                    let value = self.const_index(id, index)?;
                    let field = usize::try_from(value).ok().filter(|i| *i < fields.len());
                    let field = field.ok_or_else(|| {
                        self.malformed(
                            id,
                            format!("address computation indexes field {value} of {cur}"),
                        )
                    })?;
                    acc = acc.wrapping_add(
                        self.em
                            .module
                            .layout
                            .struct_field_offset(fields, *packed, field)
                            .unwrap_or(0) as i64,
                    );
                    let next = fields[field].clone();
                    cur = next;
                }
                IrType::Int(_) => {
                    // A leaf integer step adds the index directly.
                    self.gep_index(index, 1, &mut acc)?;
                }
                other => {
                    return Err(self.malformed(
                        id,
                        format!("address computation steps through {other}"),
                    ));
                }
            }
        }
        if acc != 0 {
            self.em.push_i64(acc);
            self.em.op(OpCode::AddI64);
        }
        Ok(())
    }

    /// One scaled address step against the address on the stack.
    /// Constant indices fold into `acc` instead of emitting anything.
    fn gep_index(&mut self, index: ValueRef, stride: i64, acc: &mut i64) -> Result<()> {
        if let ValueRef::Const(c) = index {
            if let Some(value) = self.em.module.constant(c).as_int() {
                *acc = acc.wrapping_add(value.wrapping_mul(stride));
                return Ok(());
            }
        }
        self.push_index_as_i64(index)?;
        if stride != 1 {
            self.em.push_i64(stride);
            self.em.op(OpCode::MulI64);
        }
        self.em.op(OpCode::AddI64);
        Ok(())
    }

    /// Push an index widened to a 64-bit offset. Narrow indices are
    /// sign-extended so negative steps address backwards.
    fn push_index_as_i64(&mut self, index: ValueRef) -> Result<()> {
        self.emit_value(index)?;
        if self.value_type(index).int_width() != Some(64) {
            self.em.op(OpCode::ConvI32I64);
        }
        Ok(())
    }

    /// Require a constant integer operand.
    fn const_index(&mut self, id: InstId, index: ValueRef) -> Result<i64> {
        if let ValueRef::Const(c) = index {
            if let Some(value) = self.em.module.constant(c).as_int() {
                return Ok(value);
            }
        }
        Err(self.malformed(id, "structure field index is not a constant integer"))
    }

    /// Stack allocation. Constant counts are backed by a buffer local and
    /// cost one `LocalAddr`; dynamic counts allocate from the frame's
    /// dynamic area at runtime.
    pub(super) fn emit_alloca(&mut self, id: InstId, count: ValueRef) -> Result<()> {
        if let ValueRef::Const(_) = count {
            let buffer = self.alloca_buffer(id)?;
            self.em.chunk.emit_local_addr(buffer, self.em.line);
            return Ok(());
        }
        let InstKind::Alloca { allocated, .. } = &self.func.inst(id).kind else {
            unreachable!("emit_alloca on a non-alloca instruction");
        };
        let elem_size = self.em.types.size_of(allocated) as i64;
        self.push_index_as_i64(count)?;
        self.em.push_i64(elem_size);
        self.em.op(OpCode::MulI64);
        self.em.op(OpCode::StackAlloc);
        Ok(())
    }

    /// Read one vector lane: address the lane, then do a scalar load.
    pub(super) fn emit_extract_element(
        &mut self,
        id: InstId,
        vector: ValueRef,
        index: ValueRef,
    ) -> Result<()> {
        let vec_ty = self.value_type(vector);
        let IrType::Vector { elem, .. } = &vec_ty else {
            return Err(self.malformed(id, "extractelement on a non-vector value"));
        };
        let elem = (**elem).clone();
        let stride = self.em.types.size_of(&elem) as i64;
        let load = scalar_load_op(&elem).ok_or_else(|| self.unsupported(id))?;
        self.emit_value(vector)?;
        self.lane_offset(index, stride)?;
        self.em.op(load);
        Ok(())
    }

    /// Replace one vector lane: copy the source vector into the result
    /// buffer, then store the new lane in place.
    pub(super) fn emit_insert_element(
        &mut self,
        id: InstId,
        vector: ValueRef,
        elem: ValueRef,
        index: ValueRef,
    ) -> Result<()> {
        let ty = self.func.inst(id).ty.clone();
        let IrType::Vector { elem: elem_ty, .. } = &ty else {
            return Err(self.malformed(id, "insertelement on a non-vector value"));
        };
        let elem_ty = (**elem_ty).clone();
        let stride = self.em.types.size_of(&elem_ty) as i64;
        let store = scalar_store_op(&elem_ty).ok_or_else(|| self.unsupported(id))?;
        let size = self.em.types.size_of(&ty) as i64;
        let dest = self.buf_local(id);

        self.em.chunk.emit_local_addr(dest, self.em.line);
        self.emit_value(vector)?;
        self.em.push_i64(size);
        self.em.op(OpCode::MemCopy);

        self.em.chunk.emit_local_addr(dest, self.em.line);
        self.lane_offset(index, stride)?;
        self.emit_value(elem)?;
        self.em.op(store);
        Ok(())
    }

    /// Add `index * stride` to the address on the stack. Constant lanes
    /// fold to at most one add.
    fn lane_offset(&mut self, index: ValueRef, stride: i64) -> Result<()> {
        let mut acc = 0i64;
        self.gep_index(index, stride, &mut acc)?;
        if acc != 0 {
            self.em.push_i64(acc);
            self.em.op(OpCode::AddI64);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ssalower_ir::{FnSig, IrType, ModuleBuilder, ValueRef};

    use super::super::testing::lower;
    use crate::bytecode::OpCode;

    #[test]
    fn constant_allocas_cost_one_address_push() {
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function("f", FnSig::new(vec![], IrType::I32));
        b.block();
        let one = b.const_i32(1);
        let p = b.alloca(IrType::I32, one);
        let forty_two = b.const_i32(42);
        b.store(forty_two, p);
        let v = b.load(IrType::I32, p);
        b.ret(v);
        let module = builder.finish();

        lower(&module, 0).assert_opcodes(&[
            OpCode::LocalAddr,
            OpCode::Constant,
            OpCode::StoreIndI32,
            OpCode::LocalAddr,
            OpCode::LoadIndI32,
            OpCode::Return,
        ]);
    }

    #[test]
    fn loads_are_not_deferred_past_other_instructions() {
        let mut builder = ModuleBuilder::new("m");
        let tick = builder.declare_function("tick", FnSig::new(vec![], IrType::Void));
        let mut b = builder.define_function("f", FnSig::new(vec![], IrType::I32));
        b.block();
        let one = b.const_i32(1);
        let p = b.alloca(IrType::I32, one);
        let seven = b.const_i32(7);
        b.store(seven, p);
        let v = b.load(IrType::I32, p);
        b.call(tick, vec![]);
        b.ret(v);
        let module = builder.finish();

        // The call between the load and the return pins the loaded value
        // in a local; replaying the load afterwards could see the callee's
        // writes.
        lower(&module, 1).assert_opcodes(&[
            OpCode::LocalAddr,
            OpCode::Constant,
            OpCode::StoreIndI32,
            OpCode::LocalAddr,
            OpCode::LoadIndI32,
            OpCode::SetLocal,
            OpCode::Call,
            OpCode::GetLocal,
            OpCode::Return,
        ]);
    }

    #[test]
    fn constant_index_chains_fold_to_one_add() {
        let pair = IrType::Struct {
            fields: vec![IrType::I32, IrType::I64],
            packed: false,
        };
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function("f", FnSig::new(vec![IrType::Ptr], IrType::I64));
        b.block();
        let zero = b.const_i32(0);
        let one = b.const_i32(1);
        let q = b.gep(pair, ValueRef::Arg(0), vec![zero.into(), one.into()]);
        let v = b.load(IrType::I64, q);
        b.ret(v);
        let module = builder.finish();

        // Field 1 sits at offset 8; the whole chain is one folded add.
        lower(&module, 0).assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::Constant,
            OpCode::AddI64,
            OpCode::LoadIndI64,
            OpCode::Return,
        ]);
    }

    #[test]
    fn dynamic_indices_scale_at_runtime() {
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function(
            "f",
            FnSig::new(vec![IrType::Ptr, IrType::I32], IrType::I32),
        );
        b.block();
        let q = b.gep(IrType::I32, ValueRef::Arg(0), vec![ValueRef::Arg(1)]);
        let v = b.load(IrType::I32, q);
        b.ret(v);
        let module = builder.finish();

        lower(&module, 0).assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::GetLocal,
            OpCode::ConvI32I64,
            OpCode::Constant,
            OpCode::MulI64,
            OpCode::AddI64,
            OpCode::LoadIndI32,
            OpCode::Return,
        ]);
    }

    #[test]
    fn dynamic_allocas_draw_from_the_frame() {
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function("f", FnSig::new(vec![IrType::I32], IrType::Ptr));
        b.block();
        let p = b.alloca(IrType::I32, ValueRef::Arg(0));
        b.ret(p);
        let module = builder.finish();

        lower(&module, 0).assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::ConvI32I64,
            OpCode::Constant,
            OpCode::MulI64,
            OpCode::StackAlloc,
            OpCode::Return,
        ]);
    }

    #[test]
    fn aggregate_stores_move_with_memcopy() {
        let vec4i32 = IrType::vector(IrType::I32, 4);
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function(
            "f",
            FnSig::new(vec![IrType::Ptr, vec4i32], IrType::Void),
        );
        b.block();
        b.store(ValueRef::Arg(1), ValueRef::Arg(0));
        b.ret_void();
        let module = builder.finish();

        // Destination address first, then source, then the byte count.
        lower(&module, 0).assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::LocalAddr,
            OpCode::Constant,
            OpCode::MemCopy,
            OpCode::ReturnVoid,
        ]);
    }

    #[test]
    fn extract_element_loads_one_lane() {
        let vec4f32 = IrType::vector(IrType::Float, 4);
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function("f", FnSig::new(vec![vec4f32], IrType::Float));
        b.block();
        let one = b.const_i32(1);
        let x = b.extract_element(ValueRef::Arg(0), one, IrType::Float);
        b.ret(x);
        let module = builder.finish();

        lower(&module, 0).assert_opcodes(&[
            OpCode::LocalAddr,
            OpCode::Constant,
            OpCode::AddI64,
            OpCode::LoadIndF32,
            OpCode::Return,
        ]);
    }

    #[test]
    fn insert_element_copies_then_patches_one_lane() {
        let vec4i32 = IrType::vector(IrType::I32, 4);
        let mut builder = ModuleBuilder::new("m");
        let mut b = builder.define_function(
            "f",
            FnSig::new(vec![vec4i32.clone(), IrType::I32], vec4i32.clone()),
        );
        b.block();
        let two = b.const_i32(2);
        let w = b.insert_element(ValueRef::Arg(0), ValueRef::Arg(1), two, vec4i32);
        b.ret(w);
        let module = builder.finish();

        lower(&module, 0).assert_opcodes(&[
            OpCode::LocalAddr,
            OpCode::LocalAddr,
            OpCode::Constant,
            OpCode::MemCopy,
            OpCode::LocalAddr,
            OpCode::Constant,
            OpCode::AddI64,
            OpCode::GetLocal,
            OpCode::StoreIndI32,
            OpCode::LocalAddr,
            OpCode::Return,
        ]);
    }
}
