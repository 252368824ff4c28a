//! Debug document bookkeeping for the module compiler.

use rustc_hash::FxHashMap;
use ssalower_core::{DebugSink, DocId, FileId};
use ssalower_ir::Module;

/// Memoizes source-file registration with the debug sink.
///
/// Each IR source file is announced to the sink at most once per module,
/// the first time a sequence point references it.
#[derive(Debug, Default)]
pub struct DocumentCache {
    ids: FxHashMap<FileId, DocId>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the sink document for an IR source file, registering it on
    /// first use.
    pub fn doc_for(
        &mut self,
        module: &Module,
        file: FileId,
        sink: &mut dyn DebugSink,
    ) -> DocId {
        if let Some(&doc) = self.ids.get(&file) {
            return doc;
        }
        let source = module.file(file);
        let doc = sink.document(&source.path, source.checksum.as_ref());
        self.ids.insert(file, doc);
        doc
    }
}
