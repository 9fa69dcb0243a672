//! Provider error types.

use std::time::Duration;
use thiserror::Error;

/// Tabular provider operation errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("provider returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The provider refused the request itself, e.g. an invalid tab title.
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Whether a failed call may succeed when repeated.
    ///
    /// Rate limiting, server-side faults, timeouts and transport failures are
    /// transient. Everything else is a definite answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Transport(_) | ProviderError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
