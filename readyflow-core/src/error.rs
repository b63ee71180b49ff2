//! Error types for readyflow

use thiserror::Error;

/// Result type alias for readyflow core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for readyflow core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A transition that the state machine does not allow
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State the pair was in
        from: String,
        /// State that was requested
        to: String,
    },
}
