/*
    snapshot.rs - Partitioned snapshots of one key-space

    Serializes kernel storage into a tree of named blobs:
    - oversized values get a blob of their own
    - the rest accumulate into rolling header chunks, flushed whenever
      the running size estimate would exceed the blob ceiling
    - the final `header` blob lists every auxiliary blob and carries the
      last chunk inline

    The loader dispatches on shape: a header with a `blobs` array is the
    chunked format; anything else is the legacy single-blob body.
*/

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

use crate::core_runtime::{BlobStorage, SnapshotError, SnapshotResult, SnapshotTree};
use crate::core_values::{LocalValue, SerializableValue, ValueTypeRegistry};

/// Name of the head blob every snapshot carries
pub const HEADER_BLOB_NAME: &str = "header";

/// Tuning parameters for snapshot partitioning
#[derive(Debug, Clone)]
pub struct ChunkingParams {
    /// Values with payloads at least this large get their own blob
    pub min_separate_blob_size: usize,

    /// Ceiling on the estimated size of one header chunk
    pub max_blob_size: usize,

    /// Per-entry overhead added to the size estimate; a heuristic, not
    /// a format guarantee
    pub entry_overhead: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        ChunkingParams {
            min_separate_blob_size: 8 * 1024,
            max_blob_size: 16 * 1024,
            entry_overhead: 21,
        }
    }
}

/// Partition serialized storage into a snapshot tree
pub(crate) fn serialize_storage<'a>(
    entries: impl Iterator<Item = (&'a String, &'a LocalValue)>,
    params: &ChunkingParams,
) -> SnapshotTree {
    let mut tree = SnapshotTree::new();
    let mut blob_names: Vec<String> = Vec::new();
    let mut next_blob = 0usize;

    let mut chunk = serde_json::Map::new();
    let mut chunk_estimate = 0usize;

    for (key, local_value) in entries {
        let serializable = local_value.make_serializable();
        let payload_len = serializable.payload_len();

        if payload_len >= params.min_separate_blob_size {
            let mut body = serde_json::Map::new();
            body.insert(key.clone(), serializable_to_value(&serializable));

            let name = format!("blob{next_blob}");
            next_blob += 1;
            tree.add_blob(&name, Value::Object(body).to_string());
            blob_names.push(name);
            continue;
        }

        let entry_estimate =
            serializable.value_type.len() + params.entry_overhead + payload_len;
        if !chunk.is_empty() && chunk_estimate + entry_estimate > params.max_blob_size {
            let name = format!("blob{next_blob}");
            next_blob += 1;
            tree.add_blob(&name, Value::Object(std::mem::take(&mut chunk)).to_string());
            blob_names.push(name);
            chunk_estimate = 0;
        }
        chunk.insert(key.clone(), serializable_to_value(&serializable));
        chunk_estimate += entry_estimate;
    }

    let header = serde_json::json!({
        "blobs": blob_names,
        "content": Value::Object(chunk),
    });
    tree.add_blob(HEADER_BLOB_NAME, header.to_string());
    tree
}

/// Restore storage entries from a snapshot's blobs
pub(crate) async fn load_storage(
    storage: &dyn BlobStorage,
    registry: &ValueTypeRegistry,
) -> SnapshotResult<Vec<(String, LocalValue)>> {
    let body = read_blob_json(storage, HEADER_BLOB_NAME).await?;
    let mut entries = Vec::new();

    match body.get("blobs").and_then(Value::as_array) {
        Some(blob_list) => {
            if let Some(content) = body.get("content") {
                populate_from(content, registry, &mut entries)?;
            }
            // Each blob targets distinct keys, so read order does not
            // affect the restored state.
            for name in blob_list {
                let name = name.as_str().ok_or_else(|| {
                    SnapshotError::Malformed("blob list entries must be strings".to_string())
                })?;
                let blob_body = read_blob_json(storage, name).await?;
                populate_from(&blob_body, registry, &mut entries)?;
            }
        }
        None => {
            // Legacy format: the entire header body is the data object.
            populate_from(&body, registry, &mut entries)?;
        }
    }

    Ok(entries)
}

fn serializable_to_value(serializable: &SerializableValue) -> Value {
    serde_json::json!({
        "type": serializable.value_type,
        "value": serializable.value,
    })
}

async fn read_blob_json(storage: &dyn BlobStorage, name: &str) -> SnapshotResult<Value> {
    let raw = storage.read(name).await?;
    let bytes = BASE64.decode(raw)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn populate_from(
    body: &Value,
    registry: &ValueTypeRegistry,
    entries: &mut Vec<(String, LocalValue)>,
) -> SnapshotResult<()> {
    let object = body.as_object().ok_or_else(|| {
        SnapshotError::Malformed("snapshot data must be a JSON object".to_string())
    })?;
    for (key, value) in object {
        let serializable: SerializableValue = serde_json::from_value(value.clone())?;
        entries.push((key.clone(), registry.local_value_from_serializable(&serializable)?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn storage_with(entries: Vec<(&str, Value)>) -> Vec<(String, LocalValue)> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), LocalValue::Plain(v)))
            .collect()
    }

    #[test]
    fn test_small_state_fits_in_header() {
        let entries = storage_with(vec![("a", json!(1)), ("b", json!("two"))]);
        let tree = serialize_storage(entries.iter().map(|(k, v)| (k, v)), &ChunkingParams::default());

        assert_eq!(tree.entries.len(), 1);
        let header: Value =
            serde_json::from_str(&tree.find(HEADER_BLOB_NAME).unwrap().value.contents).unwrap();
        assert_eq!(header["blobs"], json!([]));
        assert_eq!(header["content"]["a"]["type"], "Plain");
        assert_eq!(header["content"]["b"]["value"], "two");
    }

    #[test]
    fn test_oversized_value_gets_own_blob() {
        let big = "x".repeat(9 * 1024);
        let entries = storage_with(vec![("big", json!(big)), ("small", json!(1))]);
        let tree = serialize_storage(entries.iter().map(|(k, v)| (k, v)), &ChunkingParams::default());

        let header: Value =
            serde_json::from_str(&tree.find(HEADER_BLOB_NAME).unwrap().value.contents).unwrap();
        assert_eq!(header["blobs"], json!(["blob0"]));
        assert!(header["content"]["big"].is_null());
        assert_eq!(header["content"]["small"]["value"], 1);

        let blob0: Value =
            serde_json::from_str(&tree.find("blob0").unwrap().value.contents).unwrap();
        assert!(blob0["big"]["value"].as_str().unwrap().len() >= 9 * 1024);
    }

    #[test]
    fn test_chunk_flush_when_estimate_exceeded() {
        // Each entry estimates to well over a third of the ceiling, so
        // four entries must span two chunks.
        let params =
            ChunkingParams { min_separate_blob_size: 8192, max_blob_size: 100, entry_overhead: 21 };
        let payload = "y".repeat(10);
        let entries = storage_with(vec![
            ("k1", json!(payload)),
            ("k2", json!(payload)),
            ("k3", json!(payload)),
            ("k4", json!(payload)),
        ]);
        let tree = serialize_storage(entries.iter().map(|(k, v)| (k, v)), &params);

        let header: Value =
            serde_json::from_str(&tree.find(HEADER_BLOB_NAME).unwrap().value.contents).unwrap();
        let blob_names = header["blobs"].as_array().unwrap();
        assert!(!blob_names.is_empty());

        // Every key lands in exactly one place.
        let mut seen = Vec::new();
        for name in blob_names {
            let body: Value = serde_json::from_str(
                &tree.find(name.as_str().unwrap()).unwrap().value.contents,
            )
            .unwrap();
            seen.extend(body.as_object().unwrap().keys().cloned());
        }
        seen.extend(header["content"].as_object().unwrap().keys().cloned());
        seen.sort();
        assert_eq!(seen, vec!["k1", "k2", "k3", "k4"]);
    }
}
