//! Debug metadata sink.
//!
//! The compiler never builds PDB/DWARF-style tables itself. Instead it
//! streams debug events through the [`DebugSink`] trait as it emits code,
//! and the embedder decides what to record. Events arrive in emission
//! order: documents are registered once each, sequence points arrive with
//! strictly increasing bytecode offsets per method, and name events arrive
//! as locals and parameters are assigned storage.

use std::fmt;

use crate::handles::MethodHandle;

/// Identifier for a registered source document.
///
/// Returned by [`DebugSink::document`] and referenced by every sequence
/// point. Identity is sink-defined; the compiler only requires that equal
/// documents map to equal ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocId(u32);

impl DocId {
    /// Create a document id from a raw index.
    pub const fn new(index: u32) -> Self {
        DocId(index)
    }

    /// Get the raw index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc_{}", self.0)
    }
}

impl From<u32> for DocId {
    fn from(index: u32) -> Self {
        DocId(index)
    }
}

/// Receiver for debug metadata produced during compilation.
///
/// All methods have empty-op semantics available via [`NullDebugSink`];
/// implementations only need to override what they record.
pub trait DebugSink {
    /// Register a source document and return its id.
    ///
    /// The compiler memoizes per path, so each distinct document is
    /// registered exactly once per compilation.
    fn document(&mut self, path: &str, checksum: Option<&[u8; 16]>) -> DocId;

    /// Map a bytecode offset in `method` to a source position.
    fn sequence_point(&mut self, method: MethodHandle, offset: usize, doc: DocId, line: u32, col: u32);

    /// Name a local slot in `method`.
    fn local_name(&mut self, method: MethodHandle, slot: u16, name: &str);

    /// Name a parameter of `method` by position.
    fn parameter_name(&mut self, method: MethodHandle, index: u16, name: &str);
}

/// A sink that discards everything.
///
/// Used when the embedder does not want debug output; the compiler still
/// runs the same code path so behavior cannot diverge between debug and
/// release compilations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn document(&mut self, _path: &str, _checksum: Option<&[u8; 16]>) -> DocId {
        DocId(0)
    }

    fn sequence_point(&mut self, _method: MethodHandle, _offset: usize, _doc: DocId, _line: u32, _col: u32) {}

    fn local_name(&mut self, _method: MethodHandle, _slot: u16, _name: &str) {}

    fn parameter_name(&mut self, _method: MethodHandle, _index: u16, _name: &str) {}
}
