//! Error types for the chat service

use thiserror::Error;

/// Errors that can occur when asking the chat service
#[derive(Debug, Error)]
pub enum ChatError {
    /// No chat endpoint is configured
    #[error("Chat service not configured")]
    NotConfigured,

    /// The message was empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Service returned an error response
    #[error("Chat service error ({status}): {message}")]
    ServiceError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Rate limited by the service
    #[error("Rate limited. Retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_seconds: u64,
    },

    /// Service answered without any text
    #[error("Chat service returned an empty response")]
    EmptyResponse,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ChatError {
    /// Check if this error is recoverable (user can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChatError::RateLimited { .. }
                | ChatError::RequestError(_)
                | ChatError::ServiceError { status: 500..=599, .. }
        )
    }
}
