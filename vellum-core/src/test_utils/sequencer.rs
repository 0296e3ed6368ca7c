//! In-process ordering service
//!
//! Assigns client and server sequence numbers the way the real
//! service does: client sequence numbers are per-connection and
//! monotonic, server sequence numbers are global in submission order.
//! Tests drain the queue and feed every message to every replica.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core_protocol::{DeltaConnection, Operation, SequencedMessage, MESSAGE_TYPE_OP};

struct SequencerState {
    next_sequence_number: i64,
    queue: VecDeque<SequencedMessage>,
}

/// A total-order service shared by every replica in a test
#[derive(Clone)]
pub struct TestSequencer {
    state: Arc<Mutex<SequencerState>>,
}

impl TestSequencer {
    pub fn new() -> Self {
        TestSequencer {
            state: Arc::new(Mutex::new(SequencerState {
                next_sequence_number: 1,
                queue: VecDeque::new(),
            })),
        }
    }

    /// Open a connection for one replica
    pub fn connect(&self, client_id: &str) -> Box<dyn DeltaConnection> {
        Box::new(TestConnection {
            client_id: client_id.to_string(),
            next_client_seq: 1,
            state: self.state.clone(),
        })
    }

    /// Sequence an operation on behalf of a client the test controls
    /// directly (a "remote" writer without a connection object)
    pub fn push_op(&self, client_id: &str, client_seq: i64, op: &Operation) -> i64 {
        let mut state = self.state.lock().unwrap();
        let sequence_number = state.next_sequence_number;
        state.next_sequence_number += 1;
        state
            .queue
            .push_back(SequencedMessage::op(sequence_number, client_seq, client_id, op));
        sequence_number
    }

    /// Take every sequenced message queued so far
    pub fn drain(&self) -> Vec<SequencedMessage> {
        self.state.lock().unwrap().queue.drain(..).collect()
    }
}

impl Default for TestSequencer {
    fn default() -> Self {
        Self::new()
    }
}

struct TestConnection {
    client_id: String,
    next_client_seq: i64,
    state: Arc<Mutex<SequencerState>>,
}

impl DeltaConnection for TestConnection {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn submit(&mut self, contents: serde_json::Value) -> i64 {
        let client_seq = self.next_client_seq;
        self.next_client_seq += 1;

        let mut state = self.state.lock().unwrap();
        let sequence_number = state.next_sequence_number;
        state.next_sequence_number += 1;
        state.queue.push_back(SequencedMessage {
            client_sequence_number: client_seq,
            reference_sequence_number: 0,
            sequence_number,
            client_id: self.client_id.clone(),
            message_type: MESSAGE_TYPE_OP.to_string(),
            contents,
        });
        client_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sequencer_assigns_monotonic_numbers() {
        let sequencer = TestSequencer::new();
        let mut conn_a = sequencer.connect("a");
        let mut conn_b = sequencer.connect("b");

        assert_eq!(conn_a.submit(json!({ "type": "clear" })), 1);
        assert_eq!(conn_a.submit(json!({ "type": "clear" })), 2);
        assert_eq!(conn_b.submit(json!({ "type": "clear" })), 1);

        let messages = sequencer.drain();
        let seqs: Vec<i64> = messages.iter().map(|m| m.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(messages[2].client_id, "b");
        assert!(sequencer.drain().is_empty());
    }
}
