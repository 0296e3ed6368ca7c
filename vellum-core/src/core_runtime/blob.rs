/*
    blob.rs - Snapshot trees and the blob storage seam

    Snapshots are produced as a flat tree of named blobs; the host hands
    the tree to its storage service and later reads the blobs back as
    base64-encoded bodies. Blob naming inside one snapshot is stable;
    names need not be stable across snapshots (content addressing
    happens upstream).
*/

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::SnapshotResult;

/// Encoding label for UTF-8 JSON blob bodies
pub const ENCODING_UTF8: &str = "utf-8";

/// Git-style file mode of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileMode {
    #[serde(rename = "100644")]
    File,
    #[serde(rename = "040000")]
    Directory,
}

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Tree,
}

/// Body of a blob entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobContents {
    pub contents: String,
    pub encoding: String,
}

/// One named blob within a snapshot tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub value: BlobContents,
}

/// The produced form of a container snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTree {
    pub entries: Vec<TreeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SnapshotTree {
    pub fn new() -> Self {
        SnapshotTree { entries: Vec::new(), id: None }
    }

    /// Append a UTF-8 JSON blob entry
    pub fn add_blob(&mut self, path: impl Into<String>, contents: String) {
        self.entries.push(TreeEntry {
            mode: FileMode::File,
            path: path.into(),
            entry_type: EntryType::Blob,
            value: BlobContents { contents, encoding: ENCODING_UTF8.to_string() },
        });
    }

    /// Find an entry by path
    pub fn find(&self, path: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }
}

impl Default for SnapshotTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the host's blob storage
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Read a named blob; the body is base64-encoded
    async fn read(&self, name: &str) -> SnapshotResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_entry_wire_format() {
        let mut tree = SnapshotTree::new();
        tree.add_blob("header", "{}".to_string());

        let wire = serde_json::to_value(&tree).unwrap();
        let entry = &wire["entries"][0];
        assert_eq!(entry["mode"], "100644");
        assert_eq!(entry["path"], "header");
        assert_eq!(entry["type"], "blob");
        assert_eq!(entry["value"]["contents"], "{}");
        assert_eq!(entry["value"]["encoding"], "utf-8");
    }

    #[test]
    fn test_find_by_path() {
        let mut tree = SnapshotTree::new();
        tree.add_blob("blob0", "{}".to_string());
        tree.add_blob("header", "{}".to_string());

        assert!(tree.find("blob0").is_some());
        assert!(tree.find("blob1").is_none());
    }
}
