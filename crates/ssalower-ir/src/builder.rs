//! Module construction API.
//!
//! The backend consumes a finished [`Module`]; this is how one gets built,
//! whether by an IR loader or by tests. The builder supports the shapes SSA
//! construction needs:
//!
//! - declare functions first, attach bodies later (forward references),
//! - create blocks ahead of filling them (join points, loop headers),
//! - patch phi incomings after the edge's value exists (loop back-edges).
//!
//! Scalar constants are deduplicated on interning; composites are appended
//! as-is. Builder misuse (pushing with no insertion block, patching a
//! non-phi) is a caller bug and panics.

use rustc_hash::FxHashMap;
use ssalower_core::{FileId, SourceLoc};

use crate::constant::Constant;
use crate::function::{Block, Function, Param};
use crate::ids::{BlockId, ConstId, FuncId, GlobalId, InstId};
use crate::inst::{
    BinOp, Callee, ConvOp, FloatPredicate, InstKind, Instruction, IntPredicate, ValueRef,
};
use crate::layout::DataLayout;
use crate::module::{Global, Module, SourceFile};
use crate::types::{FnSig, IrType};

/// Dedup key for scalar pool entries. Floats key on their bit pattern so
/// distinct NaNs stay distinct and -0.0 is not merged with 0.0.
#[derive(PartialEq, Eq, Hash)]
enum ScalarKey {
    Int { value: i64, width: u32 },
    F32(u32),
    F64(u64),
    Null,
}

impl ScalarKey {
    fn of(constant: &Constant) -> Option<ScalarKey> {
        match constant {
            Constant::Int {
                value,
                ty: IrType::Int(width),
            } => Some(ScalarKey::Int {
                value: *value,
                width: *width,
            }),
            Constant::Float32(v) => Some(ScalarKey::F32(v.to_bits())),
            Constant::Float64(v) => Some(ScalarKey::F64(v.to_bits())),
            Constant::Null => Some(ScalarKey::Null),
            _ => None,
        }
    }
}

/// Builds a [`Module`].
pub struct ModuleBuilder {
    name: String,
    files: Vec<SourceFile>,
    globals: Vec<Global>,
    functions: Vec<Function>,
    constants: Vec<Constant>,
    scalar_pool: FxHashMap<ScalarKey, ConstId>,
}

impl ModuleBuilder {
    /// Start a new module.
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            name: name.into(),
            files: Vec::new(),
            globals: Vec::new(),
            functions: Vec::new(),
            constants: Vec::new(),
            scalar_pool: FxHashMap::default(),
        }
    }

    /// Register a source file for debug locations.
    pub fn file(&mut self, path: impl Into<String>, checksum: Option<[u8; 16]>) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        self.files.push(SourceFile {
            path: path.into(),
            checksum,
        });
        id
    }

    /// Add a global variable.
    pub fn global(
        &mut self,
        name: impl Into<String>,
        ty: IrType,
        init: Option<ConstId>,
        is_const: bool,
    ) -> GlobalId {
        let id = GlobalId::new(self.globals.len() as u32);
        self.globals.push(Global {
            name: name.into(),
            ty,
            init,
            is_const,
        });
        id
    }

    /// Intern a constant. Scalars deduplicate; composites always append.
    pub fn constant(&mut self, constant: Constant) -> ConstId {
        if let Some(key) = ScalarKey::of(&constant) {
            if let Some(&id) = self.scalar_pool.get(&key) {
                return id;
            }
            let id = ConstId::new(self.constants.len() as u32);
            self.constants.push(constant);
            self.scalar_pool.insert(key, id);
            return id;
        }
        let id = ConstId::new(self.constants.len() as u32);
        self.constants.push(constant);
        id
    }

    /// Intern an `i32` constant.
    pub fn const_i32(&mut self, value: i32) -> ConstId {
        self.constant(Constant::i32(value))
    }

    /// Intern an `i64` constant.
    pub fn const_i64(&mut self, value: i64) -> ConstId {
        self.constant(Constant::i64(value))
    }

    /// Intern an `i1` constant.
    pub fn const_bool(&mut self, value: bool) -> ConstId {
        self.constant(Constant::bool(value))
    }

    /// Intern a `float` constant.
    pub fn const_f32(&mut self, value: f32) -> ConstId {
        self.constant(Constant::Float32(value))
    }

    /// Intern a `double` constant.
    pub fn const_f64(&mut self, value: f64) -> ConstId {
        self.constant(Constant::Float64(value))
    }

    /// Intern the null pointer constant.
    pub fn const_null(&mut self) -> ConstId {
        self.constant(Constant::Null)
    }

    /// Intern an all-zero constant of `ty`.
    pub fn const_zero(&mut self, ty: IrType) -> ConstId {
        self.constant(Constant::Zero(ty))
    }

    /// Intern an undef constant of `ty`.
    pub fn const_undef(&mut self, ty: IrType) -> ConstId {
        self.constant(Constant::Undef(ty))
    }

    /// Declare a function without a body. Definitions attach one later via
    /// [`ModuleBuilder::function_builder`]; left body-less, this is an
    /// external declaration.
    pub fn declare_function(&mut self, name: impl Into<String>, sig: FnSig) -> FuncId {
        let id = FuncId::new(self.functions.len() as u32);
        let params = sig
            .params
            .iter()
            .map(|ty| Param {
                ty: ty.clone(),
                name: None,
            })
            .collect();
        self.functions.push(Function {
            name: name.into(),
            sig,
            params,
            blocks: Vec::new(),
            insts: Vec::new(),
        });
        id
    }

    /// Open a body builder for a previously declared function.
    pub fn function_builder(&mut self, func: FuncId) -> FunctionBuilder<'_> {
        FunctionBuilder {
            module: self,
            func,
            current: None,
        }
    }

    /// Declare a function and immediately open its body builder.
    pub fn define_function(
        &mut self,
        name: impl Into<String>,
        sig: FnSig,
    ) -> FunctionBuilder<'_> {
        let id = self.declare_function(name, sig);
        self.function_builder(id)
    }

    /// Finish construction.
    pub fn finish(self) -> Module {
        Module {
            name: self.name,
            layout: DataLayout::new(),
            files: self.files,
            globals: self.globals,
            functions: self.functions,
            constants: self.constants,
        }
    }
}

/// Builds one function body. Borrows the module builder so constants can be
/// interned mid-body.
pub struct FunctionBuilder<'m> {
    module: &'m mut ModuleBuilder,
    func: FuncId,
    current: Option<BlockId>,
}

impl FunctionBuilder<'_> {
    /// The id of the function being built.
    pub fn id(&self) -> FuncId {
        self.func
    }

    fn function_mut(&mut self) -> &mut Function {
        &mut self.module.functions[usize::from(self.func)]
    }

    /// Record a parameter's source-level name.
    pub fn param_name(&mut self, index: usize, name: impl Into<String>) {
        self.function_mut().params[index].name = Some(name.into());
    }

    /// Append a block. The first block created becomes the insertion point;
    /// later ones must be selected with [`FunctionBuilder::switch_to`].
    pub fn block(&mut self) -> BlockId {
        let func = self.function_mut();
        let id = BlockId::new(func.blocks.len() as u32);
        func.blocks.push(Block::default());
        if self.current.is_none() {
            self.current = Some(id);
        }
        id
    }

    /// Move the insertion point to `block`.
    pub fn switch_to(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    /// Append an instruction to the current block.
    pub fn push(&mut self, kind: InstKind, ty: IrType) -> InstId {
        let Some(block) = self.current else {
            panic!("no insertion block selected; create one with block()");
        };
        let func = self.function_mut();
        let id = InstId::new(func.insts.len() as u32);
        func.insts.push(Instruction {
            kind,
            ty,
            loc: None,
            name: None,
        });
        func.blocks[usize::from(block)].insts.push(id);
        id
    }

    /// Attach a source location to an instruction.
    pub fn set_loc(&mut self, inst: InstId, loc: SourceLoc) {
        self.function_mut().insts[usize::from(inst)].loc = Some(loc);
    }

    /// Attach a source-level name to an instruction result.
    pub fn set_name(&mut self, inst: InstId, name: impl Into<String>) {
        self.function_mut().insts[usize::from(inst)].name = Some(name.into());
    }

    /// Add an incoming edge to a phi.
    pub fn add_incoming(&mut self, phi: InstId, from: BlockId, value: impl Into<ValueRef>) {
        let value = value.into();
        let inst = &mut self.function_mut().insts[usize::from(phi)];
        match &mut inst.kind {
            InstKind::Phi { incomings } => incomings.push((from, value)),
            _ => panic!("add_incoming on non-phi instruction {phi}"),
        }
    }

    // === Instruction conveniences ===

    /// Append a binary operation.
    pub fn binary(
        &mut self,
        op: BinOp,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
        ty: IrType,
    ) -> InstId {
        self.push(
            InstKind::Binary {
                op,
                lhs: lhs.into(),
                rhs: rhs.into(),
            },
            ty,
        )
    }

    /// Append an integer comparison.
    pub fn icmp(
        &mut self,
        pred: IntPredicate,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
    ) -> InstId {
        self.push(
            InstKind::ICmp {
                pred,
                lhs: lhs.into(),
                rhs: rhs.into(),
            },
            IrType::I1,
        )
    }

    /// Append a float comparison.
    pub fn fcmp(
        &mut self,
        pred: FloatPredicate,
        lhs: impl Into<ValueRef>,
        rhs: impl Into<ValueRef>,
    ) -> InstId {
        self.push(
            InstKind::FCmp {
                pred,
                lhs: lhs.into(),
                rhs: rhs.into(),
            },
            IrType::I1,
        )
    }

    /// Append a float negation.
    pub fn fneg(&mut self, operand: impl Into<ValueRef>, ty: IrType) -> InstId {
        self.push(
            InstKind::FNeg {
                operand: operand.into(),
            },
            ty,
        )
    }

    /// Append a stack allocation; the result is the storage address.
    pub fn alloca(&mut self, allocated: IrType, count: impl Into<ValueRef>) -> InstId {
        self.push(
            InstKind::Alloca {
                allocated,
                count: count.into(),
            },
            IrType::Ptr,
        )
    }

    /// Append a load of `ty` through `ptr`.
    pub fn load(&mut self, ty: IrType, ptr: impl Into<ValueRef>) -> InstId {
        self.push(InstKind::Load { ptr: ptr.into() }, ty)
    }

    /// Append a store of `value` through `ptr`.
    pub fn store(&mut self, value: impl Into<ValueRef>, ptr: impl Into<ValueRef>) -> InstId {
        self.push(
            InstKind::Store {
                value: value.into(),
                ptr: ptr.into(),
            },
            IrType::Void,
        )
    }

    /// Append an address computation through `source_ty`.
    pub fn gep(
        &mut self,
        source_ty: IrType,
        base: impl Into<ValueRef>,
        indices: Vec<ValueRef>,
    ) -> InstId {
        self.push(
            InstKind::Gep {
                base: base.into(),
                source_ty,
                indices,
            },
            IrType::Ptr,
        )
    }

    /// Append a phi with no incomings yet; patch with
    /// [`FunctionBuilder::add_incoming`].
    pub fn phi(&mut self, ty: IrType) -> InstId {
        self.push(
            InstKind::Phi {
                incomings: Vec::new(),
            },
            ty,
        )
    }

    /// Append a direct call. The call-site signature is the callee's own.
    pub fn call(&mut self, callee: FuncId, args: Vec<ValueRef>) -> InstId {
        let sig = self.module.functions[usize::from(callee)].sig.clone();
        self.call_with_sig(callee, sig, args)
    }

    /// Append a direct call with an explicit call-site signature (variadic
    /// sites list fixed plus variadic argument types).
    pub fn call_with_sig(&mut self, callee: FuncId, sig: FnSig, args: Vec<ValueRef>) -> InstId {
        let ret = sig.ret.clone();
        self.push(
            InstKind::Call {
                callee: Callee::Func(callee),
                sig,
                args,
            },
            ret,
        )
    }

    /// Append an indirect call through a computed function address.
    pub fn call_indirect(
        &mut self,
        callee: impl Into<ValueRef>,
        sig: FnSig,
        args: Vec<ValueRef>,
    ) -> InstId {
        let ret = sig.ret.clone();
        self.push(
            InstKind::Call {
                callee: Callee::Value(callee.into()),
                sig,
                args,
            },
            ret,
        )
    }

    /// Append a select.
    pub fn select(
        &mut self,
        cond: impl Into<ValueRef>,
        if_true: impl Into<ValueRef>,
        if_false: impl Into<ValueRef>,
        ty: IrType,
    ) -> InstId {
        self.push(
            InstKind::Select {
                cond: cond.into(),
                if_true: if_true.into(),
                if_false: if_false.into(),
            },
            ty,
        )
    }

    /// Append a conversion to `ty`.
    pub fn convert(&mut self, op: ConvOp, operand: impl Into<ValueRef>, ty: IrType) -> InstId {
        self.push(
            InstKind::Convert {
                op,
                operand: operand.into(),
            },
            ty,
        )
    }

    /// Append a freeze.
    pub fn freeze(&mut self, operand: impl Into<ValueRef>, ty: IrType) -> InstId {
        self.push(
            InstKind::Freeze {
                operand: operand.into(),
            },
            ty,
        )
    }

    /// Append a vector lane read.
    pub fn extract_element(
        &mut self,
        vector: impl Into<ValueRef>,
        index: impl Into<ValueRef>,
        elem_ty: IrType,
    ) -> InstId {
        self.push(
            InstKind::ExtractElement {
                vector: vector.into(),
                index: index.into(),
            },
            elem_ty,
        )
    }

    /// Append a vector lane write.
    pub fn insert_element(
        &mut self,
        vector: impl Into<ValueRef>,
        elem: impl Into<ValueRef>,
        index: impl Into<ValueRef>,
        ty: IrType,
    ) -> InstId {
        self.push(
            InstKind::InsertElement {
                vector: vector.into(),
                elem: elem.into(),
                index: index.into(),
            },
            ty,
        )
    }

    /// Append a vector shuffle.
    pub fn shuffle(
        &mut self,
        a: impl Into<ValueRef>,
        b: impl Into<ValueRef>,
        mask: Vec<u32>,
        ty: IrType,
    ) -> InstId {
        self.push(
            InstKind::ShuffleVector {
                a: a.into(),
                b: b.into(),
                mask,
            },
            ty,
        )
    }

    /// Append a value return.
    pub fn ret(&mut self, value: impl Into<ValueRef>) -> InstId {
        self.push(
            InstKind::Ret {
                value: Some(value.into()),
            },
            IrType::Void,
        )
    }

    /// Append a void return.
    pub fn ret_void(&mut self) -> InstId {
        self.push(InstKind::Ret { value: None }, IrType::Void)
    }

    /// Append an unconditional branch.
    pub fn br(&mut self, target: BlockId) -> InstId {
        self.push(InstKind::Br { target }, IrType::Void)
    }

    /// Append a conditional branch.
    pub fn cond_br(
        &mut self,
        cond: impl Into<ValueRef>,
        if_true: BlockId,
        if_false: BlockId,
    ) -> InstId {
        self.push(
            InstKind::CondBr {
                cond: cond.into(),
                if_true,
                if_false,
            },
            IrType::Void,
        )
    }

    /// Append a switch.
    pub fn switch(
        &mut self,
        value: impl Into<ValueRef>,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    ) -> InstId {
        self.push(
            InstKind::Switch {
                value: value.into(),
                default,
                cases,
            },
            IrType::Void,
        )
    }

    /// Append an unreachable terminator.
    pub fn unreachable(&mut self) -> InstId {
        self.push(InstKind::Unreachable, IrType::Void)
    }

    // === Constant passthroughs ===

    /// Intern a constant in the enclosing module.
    pub fn constant(&mut self, constant: Constant) -> ConstId {
        self.module.constant(constant)
    }

    /// Intern an `i32` constant in the enclosing module.
    pub fn const_i32(&mut self, value: i32) -> ConstId {
        self.module.const_i32(value)
    }

    /// Intern an `i64` constant in the enclosing module.
    pub fn const_i64(&mut self, value: i64) -> ConstId {
        self.module.const_i64(value)
    }

    /// Intern an `i1` constant in the enclosing module.
    pub fn const_bool(&mut self, value: bool) -> ConstId {
        self.module.const_bool(value)
    }

    /// Intern a `float` constant in the enclosing module.
    pub fn const_f32(&mut self, value: f32) -> ConstId {
        self.module.const_f32(value)
    }

    /// Intern a `double` constant in the enclosing module.
    pub fn const_f64(&mut self, value: f64) -> ConstId {
        self.module.const_f64(value)
    }
}
