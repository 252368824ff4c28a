//! Source location tracking for debug metadata and error reporting.
//!
//! IR instructions optionally carry a [`SourceLoc`] pointing into one of the
//! module's source files. Locations flow into sequence-point events and into
//! error messages; they are never required for correct code generation.

use std::fmt;

/// Identifies a source file within a module's file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u32);

impl FileId {
    /// Create a new file ID with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

impl From<u32> for FileId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

/// A position in a source file, as declared by the producer's debug metadata.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    /// Which source file this position refers to.
    pub file: FileId,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
}

impl SourceLoc {
    /// Create a new source location.
    #[inline]
    pub fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }
}

impl fmt::Debug for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
