//! In-memory blob storage for snapshot tests

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::core_runtime::{BlobStorage, SnapshotError, SnapshotResult, SnapshotTree};

/// Blob store backed by a map of base64 bodies
#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: HashMap<String, String>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a produced snapshot tree, encoding bodies as the real
    /// store would
    pub fn from_tree(tree: &SnapshotTree) -> Self {
        let mut storage = Self::new();
        for entry in &tree.entries {
            storage.insert_utf8(&entry.path, &entry.value.contents);
        }
        storage
    }

    /// Store a UTF-8 body under a name
    pub fn insert_utf8(&mut self, name: &str, contents: &str) {
        self.blobs.insert(name.to_string(), BASE64.encode(contents.as_bytes()));
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn read(&self, name: &str) -> SnapshotResult<String> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| SnapshotError::BlobNotFound(name.to_string()))
    }
}
