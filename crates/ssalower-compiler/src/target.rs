//! The lowered output module.
//!
//! [`TargetModule`] is the container the module compiler fills in: method
//! definitions with their bytecode bodies, global storage declarations,
//! native and host import tables, interned call-site signatures, the
//! shared constant pool, and the synthesized aggregate type defs. It is
//! plain data, ready for a packager or interpreter to consume.

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use ssalower_core::MethodHandle;

use crate::bytecode::{BytecodeChunk, ConstantPool};
use crate::types::TargetTypeDef;

bitflags! {
    /// Per-method attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        /// Body-less declaration resolved against the native import table.
        const EXTERNAL = 1 << 0;
        /// The method's own signature is variadic.
        const VARARGS = 1 << 1;
        /// Frame locals are not zero-initialized on entry.
        const NO_AUTO_ZERO = 1 << 2;
    }
}

bitflags! {
    /// Per-global attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GlobalFlags: u8 {
        /// The storage is never written after module initialization.
        const CONSTANT = 1 << 0;
    }
}

/// A parameter or return type as the calling convention sees it.
///
/// Scalars travel in 64-bit slots. `Buffer` values travel by address:
/// the caller passes the address of `size` bytes, and the callee (or the
/// machine, on return) copies them into storage it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigType {
    I32,
    I64,
    F32,
    F64,
    Ptr,
    /// By-address value of the given byte size.
    Buffer { size: u64 },
}

/// A method signature, also used for interned call-site signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    pub params: Vec<SigType>,
    pub ret: Option<SigType>,
    pub varargs: bool,
}

impl MethodSig {
    pub fn new(params: Vec<SigType>, ret: Option<SigType>) -> Self {
        Self {
            params,
            ret,
            varargs: false,
        }
    }
}

/// Storage shape of one frame local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalKind {
    /// One 64-bit slot.
    Slot,
    /// Addressable frame storage of the given size and alignment.
    Buffer { size: u64, align: u64 },
}

/// A declared frame local. Parameters occupy the first locals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecl {
    pub kind: LocalKind,
    /// Source-level name, when one survived into the input.
    pub name: Option<String>,
}

impl LocalDecl {
    pub fn slot(name: Option<String>) -> Self {
        Self {
            kind: LocalKind::Slot,
            name,
        }
    }

    pub fn buffer(size: u64, align: u64, name: Option<String>) -> Self {
        Self {
            kind: LocalKind::Buffer { size, align },
            name,
        }
    }
}

/// A method definition in the target module.
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub sig: MethodSig,
    pub flags: MethodFlags,
    /// For EXTERNAL methods, the native import this method binds to.
    pub import: Option<u16>,
    /// Frame locals; parameters are the first `sig.params.len()` entries.
    pub locals: Vec<LocalDecl>,
    /// Compiled body; None for EXTERNAL methods.
    pub body: Option<BytecodeChunk>,
}

/// A global's backing static storage.
#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: String,
    pub size: u64,
    pub align: u64,
    pub flags: GlobalFlags,
}

/// One entry in the native import table.
///
/// The symbol is resolved by name against the configured native library
/// at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeImport {
    pub symbol: String,
    pub library: String,
    pub varargs: bool,
}

/// An imported host-runtime builtin (math or vector API).
///
/// Host builtins that produce a vector or aggregate take the destination
/// address as their first parameter and return nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostImport {
    pub name: String,
    pub params: Vec<SigType>,
    pub ret: Option<SigType>,
}

/// The complete lowered module.
#[derive(Debug, Clone, Default)]
pub struct TargetModule {
    pub name: String,
    /// Synthesized aggregate and fallback-vector type definitions.
    pub types: Vec<TargetTypeDef>,
    pub globals: Vec<GlobalDef>,
    pub methods: Vec<MethodDef>,
    pub imports: Vec<NativeImport>,
    pub hosts: Vec<HostImport>,
    /// Interned call-site signatures referenced by Call/CallIndirect.
    pub signatures: Vec<MethodSig>,
    pub constants: ConstantPool,
    /// The method for the configured entry symbol, if the module has one.
    pub entry_point: Option<MethodHandle>,
    /// The synthetic global-initializer method, if any global has an
    /// initializer. Runs before anything else in the module.
    pub global_init: Option<MethodHandle>,

    sig_cache: FxHashMap<MethodSig, u16>,
    host_cache: FxHashMap<String, u16>,
}

impl TargetModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Intern a call-site signature, returning its table index.
    ///
    /// # Panics
    ///
    /// Panics if the signature table grows past u16::MAX entries.
    pub fn intern_signature(&mut self, sig: MethodSig) -> u16 {
        if let Some(&idx) = self.sig_cache.get(&sig) {
            return idx;
        }
        assert!(
            self.signatures.len() < u16::MAX as usize,
            "signature table overflow"
        );
        let idx = self.signatures.len() as u16;
        self.signatures.push(sig.clone());
        self.sig_cache.insert(sig, idx);
        idx
    }

    /// Intern a host builtin by name, returning its table index.
    ///
    /// The first interning of a name fixes its signature; the host API is
    /// keyed by name, so later calls with the same name reuse the entry.
    ///
    /// # Panics
    ///
    /// Panics if the host table grows past u16::MAX entries.
    pub fn intern_host(
        &mut self,
        name: impl Into<String>,
        params: Vec<SigType>,
        ret: Option<SigType>,
    ) -> u16 {
        let name = name.into();
        if let Some(&idx) = self.host_cache.get(&name) {
            return idx;
        }
        assert!(self.hosts.len() < u16::MAX as usize, "host table overflow");
        let idx = self.hosts.len() as u16;
        self.hosts.push(HostImport {
            name: name.clone(),
            params,
            ret,
        });
        self.host_cache.insert(name, idx);
        idx
    }

    /// Get a method definition by handle.
    pub fn method(&self, handle: MethodHandle) -> &MethodDef {
        &self.methods[handle.index() as usize]
    }

    /// Get a mutable method definition by handle.
    pub fn method_mut(&mut self, handle: MethodHandle) -> &mut MethodDef {
        &mut self.methods[handle.index() as usize]
    }
}
