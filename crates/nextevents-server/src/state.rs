//! Shared router state.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use nextevents_providers::google::GoogleProvider;
use nextevents_store::CredentialStore;

use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::signing_key;

/// State shared by all handlers. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub provider: GoogleProvider,
    pub store: CredentialStore,
    key: Key,
}

impl AppState {
    /// Builds the state from a validated configuration and a migrated store.
    pub fn new(config: AppConfig, store: CredentialStore) -> ServerResult<Self> {
        let provider = GoogleProvider::new(config.google.clone())
            .map_err(|e| ServerError::config(e.message().to_string()))?;
        let key = signing_key(&config.secret_key);

        Ok(Self {
            config: Arc::new(config),
            provider,
            store,
            key,
        })
    }

    /// Whether session cookies need the `Secure` flag.
    pub fn secure_cookies(&self) -> bool {
        self.config.google.redirect_is_https()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.backend_name())
            .field("redirect_uri", &self.config.google.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}
