/*
    errors.rs - Error types for value materialization and value-type ops
*/

use thiserror::Error;

/// Errors that can occur while materializing or mutating values
#[derive(Debug, Clone, Error)]
pub enum ValueError {
    /// No value type registered under this name
    #[error("Unknown value type: {0}")]
    UnknownValueType(String),

    /// Serialized payload did not have the expected shape
    #[error("Malformed value payload: {0}")]
    MalformedPayload(String),

    /// The targeted key does not hold a value type
    #[error("Value is not a value type")]
    NotAValueType,

    /// The value type does not define this operation
    #[error("Value type '{value_type}' has no operation '{op_name}'")]
    UnknownValueOperation { value_type: String, op_name: String },

    /// The operation's prepare phase failed
    #[error("Prepare failed: {0}")]
    PrepareFailed(String),

    /// A local value-type mutation could not be emitted
    #[error("Operation emit failed: {0}")]
    EmitFailed(String),
}

/// Result type for value operations
pub type ValueResult<T> = Result<T, ValueError>;
