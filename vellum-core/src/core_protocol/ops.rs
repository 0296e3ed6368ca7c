/*
    ops.rs - Container operations

    The tagged operation sum exchanged through the ordering service.
    On-wire JSON is canonical: the `type` discriminator and camelCase
    field names below are the protocol, not an implementation detail.

    The `path` field is absent for flat-map kernels and always present
    for directory operations.
*/

use serde::{Deserialize, Serialize};

/// A value-type-defined mutation carried by an `act` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTypeOp {
    /// Name of the operation within the value type
    #[serde(rename = "opName")]
    pub op_name: String,

    /// Operation parameters, interpreted by the value type's handler
    pub value: serde_json::Value,
}

/// Operations understood by the shared map and shared directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// Store a value under a key
    Set {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        value: crate::core_values::SerializableValue,
    },

    /// Remove a key
    Delete {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Remove every key in one key-space
    Clear {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Create a child subdirectory under `path`
    CreateSubDirectory {
        path: String,
        #[serde(rename = "subdirName")]
        subdir_name: String,
    },

    /// Delete a child subdirectory (and its whole subtree) under `path`
    DeleteSubDirectory {
        path: String,
        #[serde(rename = "subdirName")]
        subdir_name: String,
    },

    /// Apply a value-type-defined mutation to the value under a key
    Act {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        value: ValueTypeOp,
    },
}

impl Operation {
    /// Parse an operation from message contents.
    ///
    /// Returns `None` for operations with an unrecognized `type` tag;
    /// callers are required to tolerate (ignore) those.
    pub fn from_wire(contents: &serde_json::Value) -> Option<Operation> {
        serde_json::from_value(contents.clone()).ok()
    }

    /// The key-space path this operation targets, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Operation::Set { path, .. }
            | Operation::Delete { path, .. }
            | Operation::Clear { path }
            | Operation::Act { path, .. } => path.as_deref(),
            Operation::CreateSubDirectory { path, .. }
            | Operation::DeleteSubDirectory { path, .. } => Some(path.as_str()),
        }
    }
}
