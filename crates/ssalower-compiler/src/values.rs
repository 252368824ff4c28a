//! Shared value emission for method bodies and the global initializer.
//!
//! [`ValueEmitter`] owns a chunk under construction together with its
//! frame's local table, and knows how to push any IR constant: scalars
//! become slot pushes, byte blobs push their pool storage address, and
//! composite constants materialize into scratch buffers field by field.

use ssalower_core::{CompileError, Result};
use ssalower_ir::{ConstId, Constant, IrType, Module};

use crate::bytecode::{BytecodeChunk, OpCode};
use crate::module::CompiledModule;
use crate::target::{LocalDecl, TargetModule};
use crate::types::TypeMapper;

/// Frame locals accumulated during emission.
///
/// Parameters occupy the first entries; everything after is created on
/// demand as values get slots, buffers, or scratch storage.
#[derive(Debug, Default)]
pub(crate) struct LocalTable {
    decls: Vec<LocalDecl>,
}

impl LocalTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a 64-bit slot local, returning its index.
    ///
    /// # Panics
    ///
    /// Panics if the frame grows past u16::MAX locals, the widest index
    /// the instruction encoding carries.
    pub(crate) fn push_slot(&mut self, name: Option<String>) -> u16 {
        self.push(LocalDecl::slot(name))
    }

    /// Append a buffer local, returning its index.
    pub(crate) fn push_buffer(&mut self, size: u64, align: u64, name: Option<String>) -> u16 {
        self.push(LocalDecl::buffer(size, align, name))
    }

    fn push(&mut self, decl: LocalDecl) -> u16 {
        assert!(
            self.decls.len() < u16::MAX as usize,
            "frame local overflow"
        );
        let index = self.decls.len() as u16;
        self.decls.push(decl);
        index
    }

    pub(crate) fn len(&self) -> usize {
        self.decls.len()
    }

    pub(crate) fn into_decls(self) -> Vec<LocalDecl> {
        self.decls
    }
}

/// A storable location: the base of a global's storage or a buffer local.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Place {
    Global(u16),
    Local(u16),
}

/// The indirect-load opcode for a scalar IR type, if it has one.
///
/// i1 loads zero-extend (canonical i1 slots hold 0 or 1); other sub-32
/// integers sign-extend to their canonical widened form.
pub(crate) fn scalar_load_op(ty: &IrType) -> Option<OpCode> {
    match ty {
        IrType::Int(1) => Some(OpCode::LoadIndU8),
        IrType::Int(8) => Some(OpCode::LoadIndI8),
        IrType::Int(16) => Some(OpCode::LoadIndI16),
        IrType::Int(32) => Some(OpCode::LoadIndI32),
        IrType::Int(64) => Some(OpCode::LoadIndI64),
        IrType::Float => Some(OpCode::LoadIndF32),
        IrType::Double => Some(OpCode::LoadIndF64),
        IrType::Ptr => Some(OpCode::LoadIndPtr),
        _ => None,
    }
}

/// The indirect-store opcode for a scalar IR type, if it has one.
pub(crate) fn scalar_store_op(ty: &IrType) -> Option<OpCode> {
    match ty {
        IrType::Int(1) | IrType::Int(8) => Some(OpCode::StoreIndI8),
        IrType::Int(16) => Some(OpCode::StoreIndI16),
        IrType::Int(32) => Some(OpCode::StoreIndI32),
        IrType::Int(64) => Some(OpCode::StoreIndI64),
        IrType::Float => Some(OpCode::StoreIndF32),
        IrType::Double => Some(OpCode::StoreIndF64),
        IrType::Ptr => Some(OpCode::StoreIndPtr),
        _ => None,
    }
}

/// Base emitter shared by the function selector and the global
/// initializer pass.
pub(crate) struct ValueEmitter<'a> {
    pub(crate) module: &'a Module,
    pub(crate) types: &'a TypeMapper<'a>,
    pub(crate) symbols: &'a CompiledModule,
    pub(crate) target: &'a mut TargetModule,
    pub(crate) chunk: BytecodeChunk,
    pub(crate) locals: LocalTable,
    /// Source line attributed to emitted bytes; updated at sequence points.
    pub(crate) line: u32,
}

impl<'a> ValueEmitter<'a> {
    pub(crate) fn new(
        module: &'a Module,
        types: &'a TypeMapper<'a>,
        symbols: &'a CompiledModule,
        target: &'a mut TargetModule,
    ) -> Self {
        Self {
            module,
            types,
            symbols,
            target,
            chunk: BytecodeChunk::new(),
            locals: LocalTable::new(),
            line: 0,
        }
    }

    pub(crate) fn op(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.line);
    }

    /// Push an i32 value, using the short forms for 0 and 1.
    pub(crate) fn push_i32(&mut self, value: i32) {
        match value {
            0 => self.op(OpCode::PushZero),
            1 => self.op(OpCode::PushOne),
            _ => {
                let index = self.target.constants.add_i32(value);
                self.chunk.emit_constant(index, self.line);
            }
        }
    }

    /// Push an i64 value, using the short forms for 0 and 1.
    pub(crate) fn push_i64(&mut self, value: i64) {
        match value {
            0 => self.op(OpCode::PushZero),
            1 => self.op(OpCode::PushOne),
            _ => {
                let index = self.target.constants.add_i64(value);
                self.chunk.emit_constant(index, self.line);
            }
        }
    }

    pub(crate) fn push_f32(&mut self, value: f32) {
        if value.to_bits() == 0 {
            self.op(OpCode::PushZero);
        } else {
            let index = self.target.constants.add_f32(value);
            self.chunk.emit_constant(index, self.line);
        }
    }

    pub(crate) fn push_f64(&mut self, value: f64) {
        if value.to_bits() == 0 {
            self.op(OpCode::PushZero);
        } else {
            let index = self.target.constants.add_f64(value);
            self.chunk.emit_constant(index, self.line);
        }
    }

    /// Push the address `place + offset`.
    pub(crate) fn push_place_addr(&mut self, place: Place, offset: u64) {
        match place {
            Place::Global(field) => {
                self.op(OpCode::GlobalAddr);
                self.chunk.write_u16(field, self.line);
            }
            Place::Local(index) => {
                self.chunk.emit_local_addr(index, self.line);
            }
        }
        if offset != 0 {
            self.push_i64(offset as i64);
            self.op(OpCode::AddI64);
        }
    }

    /// Push the value of a constant.
    ///
    /// Scalars push their slot value. Byte blobs push the address of
    /// their pool storage. Composite constants materialize into a fresh
    /// scratch buffer and push its address.
    pub(crate) fn push_constant(&mut self, id: ConstId) -> Result<()> {
        let constant = self.module.constant(id).clone();
        match constant {
            Constant::Int { value, ty } => {
                if ty.int_width() == Some(64) {
                    self.push_i64(value);
                } else {
                    self.push_i32(value as i32);
                }
                Ok(())
            }
            Constant::Float32(value) => {
                self.push_f32(value);
                Ok(())
            }
            Constant::Float64(value) => {
                self.push_f64(value);
                Ok(())
            }
            Constant::Null => {
                self.op(OpCode::PushNull);
                Ok(())
            }
            Constant::Zero(ty) | Constant::Undef(ty) => {
                let mapped = self.types.map(&ty)?;
                if mapped.is_buffer() {
                    self.push_composite(id, &ty)
                } else {
                    self.op(OpCode::PushZero);
                    Ok(())
                }
            }
            Constant::Bytes { data, .. } => {
                let index = self.target.constants.add_bytes(data);
                self.chunk.emit_constant(index, self.line);
                Ok(())
            }
            Constant::GlobalAddr(global) => {
                let field = self.symbols.global(global);
                self.op(OpCode::GlobalAddr);
                self.chunk.write_u16(field.index() as u16, self.line);
                Ok(())
            }
            Constant::FuncAddr(func) => {
                let method = self.symbols.lookup_function(func).ok_or_else(|| {
                    CompileError::malformed(format!(
                        "constant takes the address of intrinsic '{}'",
                        self.module.function(func).name
                    ))
                })?;
                self.op(OpCode::FuncPtr);
                self.chunk.write_u16(method.index() as u16, self.line);
                Ok(())
            }
            Constant::Gep {
                base,
                source_ty,
                indices,
            } => {
                self.push_constant(base)?;
                let offset = self.const_gep_offset(&source_ty, &indices)?;
                if offset != 0 {
                    self.push_i64(offset);
                    self.op(OpCode::AddI64);
                }
                Ok(())
            }
            Constant::Array { ty, .. }
            | Constant::Struct { ty, .. }
            | Constant::Vector { ty, .. } => self.push_composite(id, &ty),
        }
    }

    /// Materialize a composite constant into a scratch buffer and push
    /// the buffer's address.
    fn push_composite(&mut self, id: ConstId, ty: &IrType) -> Result<()> {
        self.types.map(ty)?;
        let size = self.types.size_of(ty);
        let align = self.types.align_of(ty);
        let scratch = self.locals.push_buffer(size, align, None);
        self.store_constant_at(id, Place::Local(scratch), 0)?;
        self.chunk.emit_local_addr(scratch, self.line);
        Ok(())
    }

    /// Write a constant's bytes at `place + offset`, recursing through
    /// composite shapes field by field.
    pub(crate) fn store_constant_at(
        &mut self,
        id: ConstId,
        place: Place,
        offset: u64,
    ) -> Result<()> {
        let constant = self.module.constant(id).clone();
        match constant {
            Constant::Int { .. }
            | Constant::Float32(_)
            | Constant::Float64(_)
            | Constant::Null
            | Constant::GlobalAddr(_)
            | Constant::FuncAddr(_)
            | Constant::Gep { .. } => {
                let ty = constant.ty();
                let store = scalar_store_op(&ty).ok_or_else(|| {
                    CompileError::malformed(format!(
                        "constant of type {ty} cannot initialize scalar storage"
                    ))
                })?;
                self.push_place_addr(place, offset);
                self.push_constant(id)?;
                self.op(store);
                Ok(())
            }
            Constant::Zero(ty) | Constant::Undef(ty) => {
                if let Some(store) = scalar_store_op(&ty) {
                    self.push_place_addr(place, offset);
                    self.op(OpCode::PushZero);
                    self.op(store);
                } else {
                    self.types.map(&ty)?;
                    self.push_place_addr(place, offset);
                    self.op(OpCode::PushZero);
                    self.push_i64(self.types.size_of(&ty) as i64);
                    self.op(OpCode::MemFill);
                }
                Ok(())
            }
            Constant::Bytes { data, .. } => {
                let len = data.len() as i64;
                let blob = self.target.constants.add_bytes(data);
                self.push_place_addr(place, offset);
                self.chunk.emit_constant(blob, self.line);
                self.push_i64(len);
                self.op(OpCode::MemCopy);
                Ok(())
            }
            Constant::Array { elems, ty } | Constant::Vector { elems, ty } => {
                let elem_ty = match &ty {
                    IrType::Array { elem, .. } | IrType::Vector { elem, .. } => elem.as_ref(),
                    other => {
                        return Err(CompileError::malformed(format!(
                            "element list constant has non-element type {other}"
                        )));
                    }
                };
                let stride = self.types.size_of(elem_ty);
                for (index, elem) in elems.iter().enumerate() {
                    self.store_constant_at(*elem, place, offset + index as u64 * stride)?;
                }
                Ok(())
            }
            Constant::Struct { fields, ty } => {
                let (field_tys, packed) = match &ty {
                    IrType::Struct { fields, packed } => (fields.as_slice(), *packed),
                    other => {
                        return Err(CompileError::malformed(format!(
                            "field list constant has non-struct type {other}"
                        )));
                    }
                };
                for (index, field) in fields.iter().enumerate() {
                    let field_offset = self
                        .module
                        .layout
                        .struct_field_offset(field_tys, packed, index)
                        .ok_or_else(|| {
                            CompileError::malformed(format!(
                                "struct constant has more fields than its type {ty}"
                            ))
                        })?;
                    self.store_constant_at(*field, place, offset + field_offset)?;
                }
                Ok(())
            }
        }
    }

    /// Fold a constant address chain to its byte offset from the base.
    fn const_gep_offset(&self, source_ty: &IrType, indices: &[ConstId]) -> Result<i64> {
        let mut offset = 0i64;
        let mut cur = source_ty.clone();
        for (position, index) in indices.iter().enumerate() {
            let value = self.module.constant(*index).as_int().ok_or_else(|| {
                CompileError::malformed(
                    "constant address computation requires integer indices",
                )
            })?;

            if position == 0 {
                offset += value * self.types.size_of(source_ty) as i64;
                continue;
            }

            match &cur {
                IrType::Array { elem, .. } | IrType::Vector { elem, .. } => {
                    offset += value * self.types.size_of(elem) as i64;
                    let next = (**elem).clone();
                    cur = next;
                }
                IrType::Struct { fields, packed } => {
                    let field = usize::try_from(value).ok().filter(|i| *i < fields.len());
                    let field = field.ok_or_else(|| {
                        CompileError::malformed(format!(
                            "constant address computation indexes field {value} of {cur}"
                        ))
                    })?;
                    offset += self
                        .module
                        .layout
                        .struct_field_offset(fields, *packed, field)
                        .unwrap_or(0) as i64;
                    let next = fields[field].clone();
                    cur = next;
                }
                IrType::Int(_) => {
                    // A leaf integer step adds the index directly.
                    offset += value;
                }
                other => {
                    return Err(CompileError::malformed(format!(
                        "constant address computation steps through {other}"
                    )));
                }
            }
        }
        Ok(offset)
    }
}
