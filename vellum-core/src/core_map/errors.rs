/*
    errors.rs - Error types for the shared map
*/

use thiserror::Error;

use crate::core_values::ValueError;

/// Errors surfaced by the shared map's synchronous API
#[derive(Debug, Error)]
pub enum MapError {
    /// Keys must be non-empty strings
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value materialization or value-type operation failed
    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    /// Operation payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for shared map operations
pub type MapResult<T> = Result<T, MapError>;

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Serialization(err.to_string())
    }
}
