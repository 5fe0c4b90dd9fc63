//! Storage error types.

use iasaver_core::PersistenceError;
use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from rusqlite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (e.g., creating directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StorageError> for PersistenceError {
    fn from(err: StorageError) -> Self {
        PersistenceError(err.to_string())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
