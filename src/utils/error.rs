//! Error types and handling
//!
//! Every fallible operation in the classifier returns [`EncError`]. Absent
//! hierarchy records are never errors; only store write validation and
//! infrastructure failures are represented here.

use thiserror::Error;

/// Classifier error types
#[derive(Debug, Error)]
pub enum EncError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Write rejected by validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Hierarchy store unreachable or failing
    #[error("Store error: {0}")]
    Store(String),

    /// Fact source communication error
    #[error("Fact source error: {0}")]
    FactSource(String),

    /// A store or fact call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used across the crate
pub type EncResult<T> = Result<T, EncError>;

impl EncError {
    /// Errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EncError::NotFound(_) | EncError::Conflict(_) | EncError::ValidationError(_)
        )
    }

    /// Errors caused by an unreachable or failing collaborator
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            EncError::Store(_) | EncError::FactSource(_) | EncError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for EncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EncError::Timeout(err.to_string())
        } else {
            EncError::FactSource(err.to_string())
        }
    }
}
