/*
    message.rs - Sequenced messages from the ordering service

    Every operation submitted by a replica comes back as a sequenced
    message carrying the submitter's client sequence number and the
    server-assigned global sequence number. `contents` stays schemaless
    until ingest so that envelopes carrying unrecognized operations
    still deserialize and can be tolerated.
*/

use serde::{Deserialize, Serialize};

use super::ops::Operation;

/// Envelope type for operation messages
pub const MESSAGE_TYPE_OP: &str = "op";

/// A message sequenced by the ordering service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedMessage {
    /// Per-replica sequence number assigned at submit time
    #[serde(rename = "clientSequenceNumber")]
    pub client_sequence_number: i64,

    /// Latest sequence number the submitter had observed when submitting
    #[serde(rename = "referenceSequenceNumber")]
    pub reference_sequence_number: i64,

    /// Server-assigned position in the total order
    #[serde(rename = "sequenceNumber")]
    pub sequence_number: i64,

    /// Identifier of the submitting client
    #[serde(rename = "clientId")]
    pub client_id: String,

    /// Envelope type; only `"op"` messages carry operations
    #[serde(rename = "type")]
    pub message_type: String,

    /// Operation payload, parsed lazily at ingest
    pub contents: serde_json::Value,
}

impl SequencedMessage {
    /// Build an `"op"` message for the given operation.
    ///
    /// Serialization of an operation cannot fail; a `null` payload would
    /// only arise from a malformed hand-built value and is rejected at
    /// ingest like any other unknown operation.
    pub fn op(
        sequence_number: i64,
        client_sequence_number: i64,
        client_id: impl Into<String>,
        operation: &Operation,
    ) -> Self {
        SequencedMessage {
            client_sequence_number,
            reference_sequence_number: 0,
            sequence_number,
            client_id: client_id.into(),
            message_type: MESSAGE_TYPE_OP.to_string(),
            contents: serde_json::to_value(operation).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Whether this envelope carries an operation
    pub fn is_op(&self) -> bool {
        self.message_type == MESSAGE_TYPE_OP
    }
}
