//! Error types for local and remote storage

use thiserror::Error;

/// Errors surfaced by key-value and record store adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// Local state file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request to the remote store failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Remote store answered with an error status
    #[error("Record store error ({status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// A stored value could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record is missing a column the store needs
    #[error("Record is missing column '{0}'")]
    MissingColumn(String),
}

impl StoreError {
    /// Whether the failure is a transient external one (retrying later may succeed)
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Request(_) | StoreError::Io(_) => true,
            StoreError::Remote { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
