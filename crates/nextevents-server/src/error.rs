//! Server error types.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use nextevents_core::TracingError;
use nextevents_providers::ProviderError;
use nextevents_store::StoreError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, signal handler).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Credential store could not be opened or migrated.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Logging could not be initialised.
    #[error("Tracing error: {0}")]
    Tracing(#[from] TracingError),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required query parameter is missing.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The provider redirect did not carry a usable authorization.
    #[error("{0}")]
    CallbackRejected(String),

    /// The authorization code could not be exchanged for tokens.
    #[error("token exchange failed: {}", .0.message())]
    TokenExchange(ProviderError),

    /// The Calendar API call failed.
    #[error("calendar request failed")]
    Calendar(ProviderError),

    /// The stored token bundle could not be read or written.
    #[error("stored credential is unusable")]
    Credential(ProviderError),

    /// The credential store failed.
    #[error("credential store unavailable")]
    Store(#[from] StoreError),
}

impl AppError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::CallbackRejected(_) | Self::TokenExchange(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Calendar(_) | Self::Credential(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Calendar(e) | Self::Credential(e) => error!(error = %e, "{}", self),
            Self::Store(e) => error!(error = %e, "{}", self),
            Self::TokenExchange(e) => warn!(error = %e, "{}", self),
            _ => warn!("{}", self),
        }
        (status, self.to_string()).into_response()
    }
}
