/*
    errors.rs - Error types for the shared directory
*/

use thiserror::Error;

use crate::core_values::ValueError;

/// Errors surfaced by the shared directory's synchronous API
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Subdirectory names must be non-empty and must not contain the
    /// path separator
    #[error("Invalid subdirectory name '{name}': {reason}")]
    InvalidSubDirectoryName { name: String, reason: String },

    /// Keys must be non-empty strings
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The addressed subdirectory does not exist
    #[error("No subdirectory at path: {0}")]
    SubDirectoryNotFound(String),

    /// Value materialization or value-type operation failed
    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    /// Operation payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for shared directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::Serialization(err.to_string())
    }
}
