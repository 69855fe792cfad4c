//! Error types for fixloop
//!
//! Centralized error handling using thiserror. Component boundaries (runner,
//! classifier, proposer, applier) recover their own failures; these errors
//! cover the plumbing around them.

use thiserror::Error;

/// All error types that can occur in fixloop
#[derive(Debug, Error)]
pub enum FixloopError {
    /// Invalid or inconsistent configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Fix cache persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Session workspace error
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for FixloopError {
    fn from(err: rusqlite::Error) -> Self {
        FixloopError::Storage(err.to_string())
    }
}

/// Result type alias for fixloop operations
pub type Result<T> = std::result::Result<T, FixloopError>;
