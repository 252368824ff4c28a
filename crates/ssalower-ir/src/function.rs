//! Functions and basic blocks.

use crate::ids::{BlockId, InstId};
use crate::inst::Instruction;
use crate::types::FnSig;

/// A function parameter with its optional source-level name.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The type, duplicated from the signature for direct access.
    pub ty: crate::types::IrType,
    /// Source-level name, when debug metadata recorded one.
    pub name: Option<String>,
}

/// A basic block: an ordered run of instructions ending in a terminator.
///
/// Blocks only hold instruction ids; the instructions themselves live in
/// the function's flat list so ids stay valid across block edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    /// Instruction ids in execution order.
    pub insts: Vec<InstId>,
}

/// A function: a definition when it has blocks, a declaration otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Symbol name.
    pub name: String,
    /// Type signature.
    pub sig: FnSig,
    /// Parameters in order, with debug names when present.
    pub params: Vec<Param>,
    /// Basic blocks in layout order. The first block is the entry. Empty
    /// for declarations.
    pub blocks: Vec<Block>,
    /// All instructions of this function, indexed by [`InstId`].
    pub insts: Vec<Instruction>,
}

impl Function {
    /// Check if this is a body-less declaration.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Check if this is a compiler built-in rather than a real callable.
    pub fn is_intrinsic(&self) -> bool {
        self.name.starts_with("llvm.")
    }

    /// Look up an instruction. Ids come from this function's builder, so a
    /// stale id is a caller bug and panics.
    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[usize::from(id)]
    }

    /// Look up a block by id.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[usize::from(id)]
    }

    /// Iterate block ids in layout order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId::new)
    }
}
