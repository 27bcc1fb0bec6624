//! Source-buffer registry
//!
//! Raw source-file bytes backing a document, keyed by document id. An
//! explicit, injected registry rather than an ambient singleton: populated
//! on load/upload, invalidated on delete. Readers that might hand the bytes
//! to something consuming take a private copy.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SourceBufferRegistry {
    buffers: HashMap<String, Vec<u8>>,
}

impl SourceBufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, document_id: &str, bytes: Vec<u8>) {
        self.buffers.insert(document_id.to_string(), bytes);
    }

    pub fn get(&self, document_id: &str) -> Option<&[u8]> {
        self.buffers.get(document_id).map(Vec::as_slice)
    }

    pub fn has(&self, document_id: &str) -> bool {
        self.buffers.contains_key(document_id)
    }

    /// Private copy for readers that may consume or transfer the buffer
    pub fn copy_of(&self, document_id: &str) -> Option<Vec<u8>> {
        self.buffers.get(document_id).cloned()
    }

    pub fn remove(&mut self, document_id: &str) -> bool {
        self.buffers.remove(document_id).is_some()
    }
}
