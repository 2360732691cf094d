//! OAuth token bundle.
//!
//! A [`TokenBundle`] holds everything needed to call the Calendar API on a
//! user's behalf, including what is needed to refresh the access token
//! without going back through the consent screen. Its JSON form is what the
//! credential store persists.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// Seconds subtracted from the reported lifetime so refresh happens early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Access/refresh token pair plus the client details needed to refresh it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    /// The access token for API requests.
    #[serde(rename = "token")]
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Token endpoint used for refreshes.
    pub token_uri: String,

    /// OAuth client ID the tokens were issued to.
    pub client_id: String,

    /// OAuth client secret used for refreshes.
    pub client_secret: String,

    /// The OAuth scopes that were granted.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scopes: Vec<String>,

    /// When the access token expires, if the token endpoint said so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TokenBundle {
    /// Creates a new bundle from token endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_uri: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes,
            expiry: expires_in_secs.and_then(expiry_from_lifetime),
        }
    }

    /// Records the client the bundle was issued through.
    pub fn with_client(
        mut self,
        token_uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.token_uri = token_uri.into();
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Parses a bundle from its stored JSON form.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ProviderError::invalid_response(format!("invalid stored token bundle: {}", e))
                .with_source(e)
        })
    }

    /// Serializes the bundle to the stored JSON form.
    pub fn to_json(&self) -> ProviderResult<String> {
        serde_json::to_string(self)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))
    }

    /// Returns true if the access token is known to be expired or about to expire.
    ///
    /// Bundles without an expiry are treated as valid.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() >= expiry,
            None => false,
        }
    }

    /// Returns true if the bundle can be refreshed without user interaction.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
            && !self.token_uri.is_empty()
    }

    /// Updates the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expiry = expires_in_secs.and_then(expiry_from_lifetime);
    }

    /// Returns a short prefix of the access token, safe for logs.
    pub fn access_token_prefix(&self) -> &str {
        let end = self
            .access_token
            .char_indices()
            .nth(10)
            .map_or(self.access_token.len(), |(i, _)| i);
        &self.access_token[..end]
    }
}

/// `expires_in` comes straight from the token endpoint; a lifetime chrono
/// cannot represent is treated as unknown.
fn expiry_from_lifetime(secs: i64) -> Option<DateTime<Utc>> {
    let lifetime = TimeDelta::try_seconds(secs.saturating_sub(EXPIRY_MARGIN_SECS))?;
    Utc::now().checked_add_signed(lifetime)
}
