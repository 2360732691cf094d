//! Google OAuth and Calendar API support.
//!
//! # Authorization Flow
//!
//! 1. [`OAuthClient::authorization_request`] yields the consent URL plus the
//!    state and PKCE verifier the caller must keep until the callback
//! 2. Google redirects back with `code` and `state`
//! 3. [`OAuthClient::exchange_code`] turns the code into a [`TokenBundle`]
//! 4. [`GoogleProvider::fetch_upcoming`] lists events with that bundle,
//!    refreshing the access token when needed
//!
//! # Example
//!
//! ```ignore
//! use nextevents_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! );
//! let provider = GoogleProvider::new(GoogleConfig::new(
//!     credentials,
//!     "http://localhost:8000/oauth2callback",
//! ))?;
//!
//! let outcome = provider.fetch_upcoming(&mut bundle).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{EventQuery, GoogleCalendarClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{AuthorizationRequest, OAuthClient, Pkce};
pub use provider::{FetchOutcome, GoogleProvider};
pub use tokens::TokenBundle;
