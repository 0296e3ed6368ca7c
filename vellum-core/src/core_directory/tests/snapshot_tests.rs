/*
    Snapshot tests - whole-tree serialization and restoration

    The directory writes one recursive data object into the header
    blob; reloading reproduces storage and tree shape exactly.
*/

use serde_json::{json, Value};

use crate::core_directory::SharedDirectory;
use crate::core_map::HEADER_BLOB_NAME;
use crate::core_runtime::HandleRef;
use crate::core_values::MapValue;
use crate::test_utils::MemoryBlobStorage;

#[tokio::test]
async fn test_nested_tree_round_trips() {
    let mut directory = SharedDirectory::new("doc");
    directory.set("owner", json!("alice")).unwrap();
    directory.set("annotations", HandleRef::new("/doc/annotations")).unwrap();
    directory
        .create_sub_directory("pages")
        .unwrap()
        .create_sub_directory("p1")
        .unwrap()
        .set("text", json!("hello"))
        .unwrap();
    directory.create_sub_directory("meta").unwrap().set("rev", json!(4)).unwrap();

    let tree = directory.snapshot().unwrap();
    assert_eq!(tree.entries.len(), 1);

    let storage = MemoryBlobStorage::from_tree(&tree);
    let mut restored = SharedDirectory::new("doc");
    restored.load(&storage).await.unwrap();

    assert_eq!(restored.get("owner"), Some(MapValue::Plain(json!("alice"))));
    assert!(
        matches!(restored.get("annotations"), Some(MapValue::Handle(h)) if h.url == "/doc/annotations")
    );
    assert_eq!(
        restored.working_directory("/pages/p1").unwrap().get("text"),
        Some(MapValue::Plain(json!("hello")))
    );
    assert_eq!(
        restored.working_directory("/meta").unwrap().get("rev"),
        Some(MapValue::Plain(json!(4)))
    );
    // Value-wise equality of the whole tree.
    assert_eq!(restored.snapshot().unwrap(), tree);
}

#[tokio::test]
async fn test_empty_directory_round_trips() {
    let directory = SharedDirectory::new("empty");
    let tree = directory.snapshot().unwrap();
    assert_eq!(tree.find(HEADER_BLOB_NAME).unwrap().value.contents, "{}");

    let storage = MemoryBlobStorage::from_tree(&tree);
    let mut restored = SharedDirectory::new("empty");
    restored.load(&storage).await.unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.sub_directories().count(), 0);
}

#[tokio::test]
async fn test_loader_dispatches_on_chunked_head_shape() {
    let head = json!({
        "blobs": [],
        "content": {
            "storage": { "k": { "type": "Plain", "value": 1 } },
            "subdirectories": { "a": {} }
        }
    });
    let mut storage = MemoryBlobStorage::new();
    storage.insert_utf8(HEADER_BLOB_NAME, &head.to_string());

    let mut directory = SharedDirectory::new("chunk-head");
    directory.load(&storage).await.unwrap();

    assert_eq!(directory.get("k"), Some(MapValue::Plain(json!(1))));
    assert!(directory.has_sub_directory("a"));
}

#[tokio::test]
async fn test_malformed_header_is_an_error() {
    let mut storage = MemoryBlobStorage::new();
    storage.insert_utf8(HEADER_BLOB_NAME, "[1, 2, 3]");

    let mut directory = SharedDirectory::new("broken");
    assert!(directory.load(&storage).await.is_err());
}

#[test]
fn test_snapshot_shape_matches_wire_contract() {
    let mut directory = SharedDirectory::new("shape");
    directory.set("k", json!("v")).unwrap();
    directory.create_sub_directory("a").unwrap().set("x", json!(1)).unwrap();

    let tree = directory.snapshot().unwrap();
    let body: Value =
        serde_json::from_str(&tree.find(HEADER_BLOB_NAME).unwrap().value.contents).unwrap();
    assert_eq!(
        body,
        json!({
            "storage": { "k": { "type": "Plain", "value": "v" } },
            "subdirectories": { "a": { "storage": { "x": { "type": "Plain", "value": 1 } } } }
        })
    );
}
