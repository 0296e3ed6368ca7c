//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur while configuring logging
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// Failed to install the global subscriber
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// Invalid configuration provided
    #[error("Invalid logging configuration: {0}")]
    InvalidConfiguration(String),
}
