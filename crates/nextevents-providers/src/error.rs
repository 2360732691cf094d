//! Failures talking to Google: token endpoint, Calendar API, stored tokens.
//!
//! Every failure is a [`ProviderError`]: a coarse [`ProviderErrorCode`] the
//! caller can branch on, a human message, and optionally the underlying error.

use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials rejected: bad code, revoked refresh token, expired access token.
    AuthenticationFailed,
    /// Authenticated, but the calendar is off limits (403).
    AuthorizationFailed,
    NetworkError,
    RateLimited,
    /// Any other non-2xx answer.
    ServerError,
    /// A 2xx answer, or a stored bundle, that does not deserialize.
    InvalidResponse,
    NotFound,
    ConfigurationError,
    InternalError,
}

impl ProviderErrorCode {
    /// Maps a non-success Calendar API status to a code.
    pub fn for_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::AuthenticationFailed,
            StatusCode::FORBIDDEN => Self::AuthorizationFailed,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            _ => Self::ServerError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a reqwest failure that happened before a status was received.
    ///
    /// `context` names what was being attempted, e.g. `"token exchange"`.
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{} timed out", context)
        } else if err.is_connect() {
            format!("{}: connection failed", context)
        } else {
            format!("{} failed", context)
        };
        Self::new(ProviderErrorCode::NetworkError, message).with_source(err)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The access token was rejected; a refresh may help.
    pub fn is_unauthorized(&self) -> bool {
        self.code == ProviderErrorCode::AuthenticationFailed
    }
}
