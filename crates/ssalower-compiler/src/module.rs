//! Two-pass module lowering.
//!
//! Pass one (declare) assigns every global a field and every non-intrinsic
//! function a method shell, building the [`CompiledModule`] symbol table.
//! Pass two (emit) synthesizes the global initializer and runs instruction
//! selection over each definition. Bodies may reference any symbol in the
//! module regardless of order because declaration completes first.

use ssalower_core::{DebugSink, FieldHandle, MethodHandle, Result};
use ssalower_ir::{FuncId, GlobalId, Module};

use crate::bytecode::OpCode;
use crate::debug::DocumentCache;
use crate::intrinsics::IntrinsicRegistry;
use crate::options::CompileOptions;
use crate::select::FunctionSelector;
use crate::target::{
    GlobalDef, GlobalFlags, MethodDef, MethodFlags, MethodSig, NativeImport, TargetModule,
};
use crate::types::TypeMapper;
use crate::values::{Place, ValueEmitter};

/// Symbol table mapping IR ids to target handles.
///
/// Built by the declare pass and read-only afterwards. Intrinsic
/// declarations are never materialized as methods and resolve to `None`.
#[derive(Debug, Default)]
pub struct CompiledModule {
    functions: Vec<Option<MethodHandle>>,
    globals: Vec<FieldHandle>,
}

impl CompiledModule {
    /// The method lowered for a function.
    ///
    /// # Panics
    ///
    /// Panics if `id` names an intrinsic declaration; intrinsic calls are
    /// rewritten during selection and never reach the method table.
    pub fn function(&self, id: FuncId) -> MethodHandle {
        match self.lookup_function(id) {
            Some(method) => method,
            None => panic!("{id} is an intrinsic and has no lowered method"),
        }
    }

    /// The method lowered for a function, or `None` for intrinsics.
    pub fn lookup_function(&self, id: FuncId) -> Option<MethodHandle> {
        self.functions[usize::from(id)]
    }

    /// The field backing a global.
    pub fn global(&self, id: GlobalId) -> FieldHandle {
        self.globals[usize::from(id)]
    }
}

/// Everything module lowering produces.
#[derive(Debug)]
pub struct CompilationResult {
    /// The lowered module, ready for serialization or execution.
    pub target: TargetModule,
    /// The symbol table relating IR ids to target handles.
    pub symbols: CompiledModule,
}

/// Drives the two lowering passes over one module.
pub struct ModuleCompiler<'a> {
    module: &'a Module,
    options: &'a CompileOptions,
    types: TypeMapper<'a>,
    intrinsics: IntrinsicRegistry,
    target: TargetModule,
}

impl<'a> ModuleCompiler<'a> {
    pub fn new(module: &'a Module, options: &'a CompileOptions) -> Self {
        Self {
            module,
            options,
            types: TypeMapper::new(&module.layout),
            intrinsics: IntrinsicRegistry::new(),
            target: TargetModule::new(module.name.clone()),
        }
    }

    /// Run both passes and hand back the finished module.
    pub fn compile(mut self, sink: &mut dyn DebugSink) -> Result<CompilationResult> {
        let symbols = self.declare()?;
        self.target.entry_point = self
            .module
            .find_function(&self.options.entry_symbol)
            .and_then(|id| symbols.lookup_function(id));
        self.emit(&symbols, sink)?;
        Ok(CompilationResult {
            target: self.target,
            symbols,
        })
    }

    /// Pass one: fields for globals, method shells for functions.
    #[cfg_attr(feature = "profiling", profiling::function)]
    #[tracing::instrument(level = "debug", skip_all, fields(
        globals = self.module.globals.len(),
        functions = self.module.functions.len(),
    ))]
    fn declare(&mut self) -> Result<CompiledModule> {
        let mut symbols = CompiledModule::default();

        for global in &self.module.globals {
            self.types.map(&global.ty)?;
            let field = FieldHandle::new(self.target.globals.len() as u32);
            let mut flags = GlobalFlags::empty();
            if global.is_const {
                flags |= GlobalFlags::CONSTANT;
            }
            self.target.globals.push(GlobalDef {
                name: global.name.clone(),
                size: self.types.size_of(&global.ty),
                align: self.types.align_of(&global.ty),
                flags,
            });
            symbols.globals.push(field);
        }

        for function in &self.module.functions {
            if function.is_intrinsic() {
                symbols.functions.push(None);
                continue;
            }
            let mut sig = self.types.method_sig(&function.sig)?;
            sig.varargs = function.sig.varargs;

            let import = if function.is_declaration() {
                assert!(
                    self.target.imports.len() < u16::MAX as usize,
                    "native import table overflow"
                );
                let index = self.target.imports.len() as u16;
                self.target.imports.push(NativeImport {
                    symbol: function.name.clone(),
                    library: self.options.native_library.clone(),
                    varargs: function.sig.varargs,
                });
                Some(index)
            } else {
                None
            };

            // Emitted bodies assign every local before its first read, so
            // definitions skip frame auto-zeroing.
            let mut flags = if import.is_some() {
                MethodFlags::EXTERNAL
            } else {
                MethodFlags::NO_AUTO_ZERO
            };
            if function.sig.varargs {
                flags |= MethodFlags::VARARGS;
            }

            let method = MethodHandle::new(self.target.methods.len() as u32);
            self.target.methods.push(MethodDef {
                name: function.name.clone(),
                sig,
                flags,
                import,
                locals: Vec::new(),
                body: None,
            });
            symbols.functions.push(Some(method));
        }

        tracing::debug!(
            methods = self.target.methods.len(),
            imports = self.target.imports.len(),
            "declare pass complete"
        );
        Ok(symbols)
    }

    /// Pass two: the global initializer, then every definition's body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    #[tracing::instrument(level = "debug", skip_all)]
    fn emit(&mut self, symbols: &CompiledModule, sink: &mut dyn DebugSink) -> Result<()> {
        self.emit_global_init(symbols)?;

        let module = self.module;
        let mut docs = DocumentCache::new();
        for (index, function) in module.functions.iter().enumerate() {
            if function.is_declaration() {
                continue;
            }
            let method = symbols.function(FuncId::new(index as u32));
            tracing::trace!(function = %function.name, %method, "selecting body");
            let artifacts = FunctionSelector::new(
                module,
                &self.types,
                symbols,
                &mut self.target,
                &self.intrinsics,
                function,
                method,
                &mut docs,
                sink,
            )
            .run()?;
            let def = self.target.method_mut(method);
            def.locals = artifacts.locals;
            def.body = Some(artifacts.chunk);
        }

        self.target.types = self.types.take_defs();
        Ok(())
    }

    /// Synthesize the initializer method when any global carries one.
    ///
    /// Each initialized global's constant is stored into its field, in
    /// declaration order. The method runs before anything else in the
    /// module.
    fn emit_global_init(&mut self, symbols: &CompiledModule) -> Result<()> {
        if self.module.globals.iter().all(|global| global.init.is_none()) {
            return Ok(());
        }

        let module = self.module;
        let mut em = ValueEmitter::new(module, &self.types, symbols, &mut self.target);
        for (index, global) in module.globals.iter().enumerate() {
            let Some(init) = global.init else { continue };
            let field = symbols.global(GlobalId::new(index as u32));
            em.store_constant_at(init, Place::Global(field.index() as u16), 0)?;
        }
        em.op(OpCode::ReturnVoid);
        let locals = em.locals.into_decls();
        let body = em.chunk;

        let method = MethodHandle::new(self.target.methods.len() as u32);
        self.target.methods.push(MethodDef {
            name: "<global-init>".to_string(),
            sig: MethodSig::new(Vec::new(), None),
            flags: MethodFlags::empty(),
            import: None,
            locals,
            body: Some(body),
        });
        self.target.global_init = Some(method);
        Ok(())
    }
}

/// Lower a module to bytecode.
///
/// The crate entry point. `sink` receives document, sequence-point, and
/// symbol-name events as bodies are emitted;
/// [`NullDebugSink`](ssalower_core::NullDebugSink) discards them.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn compile_module(
    module: &Module,
    options: &CompileOptions,
    sink: &mut dyn DebugSink,
) -> Result<CompilationResult> {
    ModuleCompiler::new(module, options).compile(sink)
}
