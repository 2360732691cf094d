//! Error types for the credential store.

use thiserror::Error;

/// Errors that can occur while talking to the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("unsupported database URL '{0}' (expected sqlite:... or postgres://...)")]
    UnsupportedUrl(String),

    #[error("{0} support is not enabled in this build")]
    BackendDisabled(&'static str),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
