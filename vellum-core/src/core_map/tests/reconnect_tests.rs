/*
    Reconnect tests - detached submission and resubmission

    A detached container queues every local op with client sequence -1;
    connecting re-drives the queue through the connection and refreshes
    the pending markers with the newly assigned numbers. The same path
    recovers lost submissions after a disconnect.
*/

use serde_json::json;

use crate::core_map::SharedMap;
use crate::core_protocol::DETACHED_CLIENT_SEQUENCE_NUMBER;
use crate::core_values::MapValue;
use crate::test_utils::{assert_converged, assert_ok, TestSequencer};

#[tokio::test]
async fn test_detached_ops_resubmit_on_connect() {
    let mut map = SharedMap::new("detached");
    assert!(!map.is_attached());

    assert_ok(map.set("k", json!(1)));
    assert_ok(map.set("k2", json!(2)));
    assert_eq!(map.pending_op_count(), 2);
    assert_eq!(map.get("k"), Some(MapValue::Plain(json!(1))));

    let sequencer = TestSequencer::new();
    map.connect(sequencer.connect("client-a"));

    let messages = sequencer.drain();
    assert_eq!(messages.len(), 2);
    assert_ne!(messages[0].client_sequence_number, DETACHED_CLIENT_SEQUENCE_NUMBER);

    for message in &messages {
        map.process_message(message).await;
    }
    assert_eq!(map.pending_op_count(), 0);
    assert!(!map.kernel().has_pending_key("k"));
    assert!(!map.kernel().has_pending_key("k2"));
    assert_eq!(map.get("k"), Some(MapValue::Plain(json!(1))));
}

#[tokio::test]
async fn test_reconnect_resends_unacknowledged_ops() {
    let sequencer = TestSequencer::new();
    let mut map = SharedMap::new("reconnect");
    map.connect(sequencer.connect("client-a"));

    map.set("k", json!("v")).unwrap();
    // The submission is lost before it is sequenced.
    sequencer.drain();
    map.disconnect();

    map.set("k2", json!("w")).unwrap();
    assert_eq!(map.pending_op_count(), 2);

    map.connect(sequencer.connect("client-a"));
    let messages = sequencer.drain();
    assert_eq!(messages.len(), 2);

    // A second replica sees only the resubmitted stream and converges.
    let mut observer = SharedMap::new("reconnect");
    observer.connect(sequencer.connect("client-b"));
    for message in &messages {
        map.process_message(message).await;
        observer.process_message(message).await;
    }
    assert_eq!(map.pending_op_count(), 0);
    assert_converged(&map, &observer);
}

#[tokio::test]
async fn test_detached_delete_and_clear_queue() {
    let mut map = SharedMap::new("detached-ops");
    map.set("a", json!(1)).unwrap();
    assert!(map.delete("a").unwrap());
    map.clear().unwrap();
    assert_eq!(map.pending_op_count(), 3);

    let sequencer = TestSequencer::new();
    map.connect(sequencer.connect("client-a"));
    for message in sequencer.drain() {
        map.process_message(&message).await;
    }
    assert_eq!(map.pending_op_count(), 0);
    assert_eq!(map.kernel().pending_clear(), None);
    assert!(map.is_empty());
}
