/*
    errors.rs - Snapshot and blob storage errors
*/

use thiserror::Error;

use crate::core_values::ValueError;

/// Errors that can occur while producing or restoring snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Underlying blob storage failed
    #[error("Blob storage error: {0}")]
    Storage(String),

    /// A blob named by the snapshot is missing
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    /// Blob body was not valid base64
    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Blob body did not have the expected shape
    #[error("Malformed snapshot body: {0}")]
    Malformed(String),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be materialized
    #[error("Value error: {0}")]
    Value(#[from] ValueError),
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_error_display() {
        let err = SnapshotError::BlobNotFound("blob7".to_string());
        assert_eq!(err.to_string(), "Blob not found: blob7");
    }

    #[test]
    fn test_value_error_conversion() {
        let err: SnapshotError = ValueError::UnknownValueType("counter".to_string()).into();
        assert!(matches!(err, SnapshotError::Value(_)));
    }
}
