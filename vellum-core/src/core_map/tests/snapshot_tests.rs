/*
    Snapshot tests - partitioning and restoration

    The chunking law: reloading a produced tree yields exactly the
    original entries, with oversized values separated into their own
    blobs and header chunks flushed at the size ceiling.
*/

use serde_json::{json, Value};

use crate::core_map::{ChunkingParams, SharedMap, HEADER_BLOB_NAME};
use crate::core_values::MapValue;
use crate::test_utils::MemoryBlobStorage;

#[tokio::test]
async fn test_small_state_round_trips() {
    let mut map = SharedMap::new("small");
    map.set("a", json!(1)).unwrap();
    map.set("b", json!({ "nested": [true, null] })).unwrap();
    map.set("c", json!("text")).unwrap();

    let tree = map.snapshot();
    assert_eq!(tree.entries.len(), 1);
    assert!(tree.find(HEADER_BLOB_NAME).is_some());

    let storage = MemoryBlobStorage::from_tree(&tree);
    let mut restored = SharedMap::new("small");
    restored.load(&storage).await.unwrap();

    assert_eq!(restored.len(), 3);
    assert_eq!(restored.get("a"), Some(MapValue::Plain(json!(1))));
    assert_eq!(restored.get("b"), Some(MapValue::Plain(json!({ "nested": [true, null] }))));
    assert_eq!(restored.get("c"), Some(MapValue::Plain(json!("text"))));
}

#[tokio::test]
async fn test_large_state_partitions_and_round_trips() {
    let mut map = SharedMap::new("large");
    // Ten 2 KiB values roll through the header chunks; the first
    // seven fit under the 16 KiB estimate, so one chunk is flushed.
    for i in 0..10 {
        map.set(&format!("k{i}"), json!("a".repeat(2048))).unwrap();
    }
    // One 20 KiB value exceeds the separate-blob threshold.
    map.set("big", json!("b".repeat(20 * 1024))).unwrap();

    let tree = map.snapshot();
    let header: Value =
        serde_json::from_str(&tree.find(HEADER_BLOB_NAME).unwrap().value.contents).unwrap();
    let blob_names: Vec<&str> =
        header["blobs"].as_array().unwrap().iter().map(|n| n.as_str().unwrap()).collect();
    assert_eq!(blob_names, vec!["blob0", "blob1"]);

    // blob0 is the flushed chunk of the first seven small entries.
    let blob0: Value = serde_json::from_str(&tree.find("blob0").unwrap().value.contents).unwrap();
    assert_eq!(blob0.as_object().unwrap().len(), 7);

    // blob1 carries the oversized value on its own.
    let blob1: Value = serde_json::from_str(&tree.find("blob1").unwrap().value.contents).unwrap();
    assert_eq!(blob1.as_object().unwrap().len(), 1);
    assert!(blob1["big"]["value"].as_str().unwrap().len() == 20 * 1024);

    // The remaining three entries ride in the header itself.
    assert_eq!(header["content"].as_object().unwrap().len(), 3);

    let storage = MemoryBlobStorage::from_tree(&tree);
    let mut restored = SharedMap::new("large");
    restored.load(&storage).await.unwrap();

    assert_eq!(restored.len(), 11);
    for i in 0..10 {
        assert_eq!(
            restored.get(&format!("k{i}")),
            Some(MapValue::Plain(json!("a".repeat(2048))))
        );
    }
    assert_eq!(restored.get("big"), Some(MapValue::Plain(json!("b".repeat(20 * 1024)))));
}

#[tokio::test]
async fn test_legacy_single_blob_header_loads() {
    let mut storage = MemoryBlobStorage::new();
    storage.insert_utf8(
        HEADER_BLOB_NAME,
        r#"{"k":{"type":"Plain","value":5},"h":{"type":"Shared","value":{"url":"/doc/child"}}}"#,
    );

    let mut map = SharedMap::new("legacy");
    map.load(&storage).await.unwrap();

    assert_eq!(map.get("k"), Some(MapValue::Plain(json!(5))));
    assert!(matches!(map.get("h"), Some(MapValue::Handle(h)) if h.url == "/doc/child"));
}

#[tokio::test]
async fn test_custom_chunking_params() {
    let mut map = SharedMap::new("tuned");
    for i in 0..4 {
        map.set(&format!("k{i}"), json!("x".repeat(32))).unwrap();
    }

    // Tiny ceiling forces a flush on every entry after the first.
    let params =
        ChunkingParams { min_separate_blob_size: 1024, max_blob_size: 64, entry_overhead: 21 };
    let tree = map.snapshot_with_params(&params);
    let header: Value =
        serde_json::from_str(&tree.find(HEADER_BLOB_NAME).unwrap().value.contents).unwrap();
    assert_eq!(header["blobs"].as_array().unwrap().len(), 3);

    let storage = MemoryBlobStorage::from_tree(&tree);
    let mut restored = SharedMap::new("tuned");
    restored.load(&storage).await.unwrap();
    assert_eq!(restored.len(), 4);
}

#[tokio::test]
async fn test_missing_blob_is_an_error() {
    let mut storage = MemoryBlobStorage::new();
    storage.insert_utf8(HEADER_BLOB_NAME, r#"{"blobs":["blob0"],"content":{}}"#);

    let mut map = SharedMap::new("broken");
    assert!(map.load(&storage).await.is_err());
}
