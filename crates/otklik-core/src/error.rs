use thiserror::Error;

use crate::models::RunStatus;

/// Application-wide error types for otklik.
#[derive(Error, Debug)]
pub enum EngineError {
    /// HTTP request returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No session credential (resume hash / xsrf token) is available.
    #[error("No session credential available")]
    NoCredential,

    /// The remote service reported the daily submission quota as exhausted.
    #[error("Submission quota exceeded")]
    QuotaExceeded,

    /// Key-value store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Illegal run-state transition.
    #[error("Invalid run-state transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl EngineError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Network(_) | EngineError::Timeout(_) | EngineError::Http(_)
        )
    }

    /// Returns true if this error must stop the whole run, not just the
    /// current vacancy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::QuotaExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(EngineError::Network("reset".into()).is_retryable());
        assert!(EngineError::Timeout(10).is_retryable());
        assert!(EngineError::Http("HTTP 502".into()).is_retryable());
        assert!(!EngineError::NoCredential.is_retryable());
        assert!(!EngineError::QuotaExceeded.is_retryable());
        assert!(!EngineError::Store("disk full".into()).is_retryable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(EngineError::QuotaExceeded.is_fatal());
        assert!(!EngineError::Timeout(10).is_fatal());
        assert!(!EngineError::NoCredential.is_fatal());
    }
}
