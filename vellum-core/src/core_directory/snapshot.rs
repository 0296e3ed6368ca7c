/*
    snapshot.rs - Whole-tree directory snapshots

    The directory serializes as one recursive data object in a single
    `header` blob. The loader dispatches on the header's shape so the
    chunked scheme used by the flat map could be adopted later without
    a format break.
*/

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core_map::HEADER_BLOB_NAME;
use crate::core_runtime::{BlobStorage, SnapshotError, SnapshotResult, SnapshotTree};
use crate::core_values::SerializableValue;

/// Recursive serialized form of the directory tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryDataObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<String, SerializableValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdirectories: Option<BTreeMap<String, DirectoryDataObject>>,
}

/// Produce the single-blob snapshot tree for a directory
pub(crate) fn tree_from_data(data: &DirectoryDataObject) -> SnapshotResult<SnapshotTree> {
    let mut tree = SnapshotTree::new();
    tree.add_blob(HEADER_BLOB_NAME, serde_json::to_string(data)?);
    Ok(tree)
}

/// Read the directory data object back from blob storage
pub(crate) async fn data_from_storage(
    storage: &dyn BlobStorage,
) -> SnapshotResult<DirectoryDataObject> {
    let raw = storage.read(HEADER_BLOB_NAME).await?;
    let bytes = BASE64.decode(raw)?;
    let body: Value = serde_json::from_slice(&bytes)?;

    // A header carrying a blob list is the chunked head shape; the
    // data object then lives under `content`.
    let data_value = if body.get("blobs").is_some() {
        body.get("content").cloned().ok_or_else(|| {
            SnapshotError::Malformed("chunked header without content".to_string())
        })?
    } else {
        body
    };
    Ok(serde_json::from_value(data_value)?)
}
