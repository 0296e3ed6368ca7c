/*
    serializable.rs - The wire form of a stored value

    Every value travels and snapshots as { type, value }. `type` is
    either "Plain" (raw JSON), "Shared" (a handle reference), or the
    name of a registered value type whose payload is opaque to the core.
*/

use serde::{Deserialize, Serialize};

use crate::core_runtime::HandleRef;

/// Type tag for raw JSON payloads
pub const PLAIN_VALUE_TYPE: &str = "Plain";

/// Type tag for handle references to other shared objects
pub const SHARED_VALUE_TYPE: &str = "Shared";

/// The serialized form of a stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableValue {
    /// "Plain", "Shared", or a registered value-type name
    #[serde(rename = "type")]
    pub value_type: String,

    /// Encoded payload; JSON for plain and shared values, value-type
    /// defined otherwise
    pub value: serde_json::Value,
}

impl SerializableValue {
    /// A plain JSON value
    pub fn plain(value: serde_json::Value) -> Self {
        SerializableValue { value_type: PLAIN_VALUE_TYPE.to_string(), value }
    }

    /// A handle reference to another shared object
    pub fn shared(handle: &HandleRef) -> Self {
        SerializableValue {
            value_type: SHARED_VALUE_TYPE.to_string(),
            value: serde_json::json!({ "url": handle.url }),
        }
    }

    /// Length of the serialized payload, as counted by the snapshot
    /// chunker
    pub fn payload_len(&self) -> usize {
        self.value.to_string().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_wire_format() {
        let value = SerializableValue::plain(json!({ "n": 1 }));
        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(wire, json!({ "type": "Plain", "value": { "n": 1 } }));
    }

    #[test]
    fn test_shared_wire_format() {
        let value = SerializableValue::shared(&HandleRef::new("/doc/child"));
        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(wire, json!({ "type": "Shared", "value": { "url": "/doc/child" } }));
    }

    #[test]
    fn test_round_trip() {
        let value = SerializableValue::plain(json!([1, 2, 3]));
        let wire = serde_json::to_value(&value).unwrap();
        let back: SerializableValue = serde_json::from_value(wire).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_payload_len() {
        let value = SerializableValue::plain(json!("abcd"));
        // "abcd" serializes with quotes
        assert_eq!(value.payload_len(), 6);
    }
}
