//! The module: the root container the backend consumes.

use crate::constant::Constant;
use crate::function::Function;
use crate::ids::{ConstId, FuncId, GlobalId};
use crate::layout::DataLayout;
use crate::types::IrType;
use ssalower_core::FileId;

/// A source file referenced by debug metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Path as recorded by the producer.
    pub path: String,
    /// MD5 checksum of the file contents, when recorded.
    pub checksum: Option<[u8; 16]>,
}

/// A module-level global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    /// Symbol name.
    pub name: String,
    /// Type of the stored value (not of the address).
    pub ty: IrType,
    /// Initializer, when the global has one. Uninitialized globals are
    /// zero-filled.
    pub init: Option<ConstId>,
    /// Whether the contents never change after initialization.
    pub is_const: bool,
}

/// A whole compilation unit. The backend reads it and never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module name, used for diagnostics only.
    pub name: String,
    /// Layout oracle for every size/offset question.
    pub layout: DataLayout,
    /// Source files referenced by instruction locations, indexed by
    /// [`FileId`].
    pub files: Vec<SourceFile>,
    /// Globals, indexed by [`GlobalId`].
    pub globals: Vec<Global>,
    /// Functions (definitions and declarations), indexed by [`FuncId`].
    pub functions: Vec<Function>,
    /// Constant pool, indexed by [`ConstId`].
    pub constants: Vec<Constant>,
}

impl Module {
    /// Look up a function.
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[usize::from(id)]
    }

    /// Look up a global.
    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[usize::from(id)]
    }

    /// Look up a constant.
    pub fn constant(&self, id: ConstId) -> &Constant {
        &self.constants[usize::from(id)]
    }

    /// Look up a source file.
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index() as usize]
    }

    /// Find a function by symbol name.
    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|i| FuncId::new(i as u32))
    }
}
