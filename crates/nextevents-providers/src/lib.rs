//! Google OAuth and Calendar API clients.
//!
//! - [`google::OAuthClient`] - authorization URL, code exchange, token refresh
//! - [`google::GoogleProvider`] - lists upcoming events with a [`google::TokenBundle`]
//! - [`ProviderError`] - error types for provider operations

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
