//! Muninn error types

use std::time::Duration;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Backend errors
    #[error("backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    #[error("{stage} timed out after {after:?}")]
    Timeout {
        stage: &'static str,
        after: Duration,
    },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Reranker returned an index outside the candidate set.
    #[error("reranker returned index {index} for {len} candidates")]
    InvalidRerank { index: usize, len: usize },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no search backend configured")]
    NoBackend,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MuninnError {
    /// Shorthand for a [`MuninnError::Backend`] failure.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        MuninnError::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether the failure may succeed if the call is repeated.
    ///
    /// Timeouts, rate limits and backend failures are transient; malformed
    /// input, bad reranker output and configuration problems are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MuninnError::Backend { .. }
                | MuninnError::Timeout { .. }
                | MuninnError::RateLimited { .. }
        )
    }

    /// Back-off hint carried by a [`MuninnError::RateLimited`] error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MuninnError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
