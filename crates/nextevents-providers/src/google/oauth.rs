//! Authorization-code flow against Google's OAuth endpoints.
//!
//! A round trip starts with [`OAuthClient::authorization_request`], whose
//! `state` and PKCE verifier the web layer keeps in the browser session. When
//! Google redirects back, the caller compares `state` and hands the code and
//! verifier to [`OAuthClient::exchange_code`]. Consent is always requested
//! with `access_type=offline` so a refresh token comes back.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::config::GoogleConfig;
use super::tokens::TokenBundle;
use crate::error::{ProviderError, ProviderResult};

/// Random bytes behind a PKCE verifier; encodes to 43 characters.
const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 24;

/// An authorization request ready to be sent to the browser.
///
/// `state` and `code_verifier` must be kept until the callback arrives.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// The provider URL to redirect the browser to.
    pub url: String,
    /// Anti-forgery state round-tripped through the redirect.
    pub state: String,
    /// PKCE verifier needed by the code exchange.
    pub code_verifier: String,
}

/// OAuth client for Google APIs.
///
/// Builds authorization URLs, exchanges codes and refreshes tokens.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: GoogleConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client sharing the given HTTP client.
    pub fn new(config: GoogleConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Starts a new authorization round trip.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let pkce = Pkce::generate();
        let state = random_token(STATE_BYTES);
        let url = self.consent_url(&state, &pkce.challenge);
        debug!("authorization URL: {}", url);

        AuthorizationRequest {
            url,
            state,
            code_verifier: pkce.verifier,
        }
    }

    fn consent_url(&self, state: &str, challenge: &str) -> String {
        let scope = self.config.scopes.join(" ");
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.credentials.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("include_granted_scopes", "true"),
            ("prompt", "consent"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.config.auth_url, query)
    }

    /// Exchanges an authorization code for a token bundle.
    ///
    /// The bundle records the token endpoint and client credentials so it can
    /// be refreshed later from storage alone.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> ProviderResult<TokenBundle> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("client_secret", self.config.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let token_response = self
            .post_token_request(&self.config.token_url, &params, "token exchange")
            .await?;

        let scopes = token_response
            .granted_scopes()
            .unwrap_or_else(|| self.config.scopes.clone());

        info!("successfully obtained tokens");
        Ok(TokenBundle::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            scopes,
        )
        .with_client(
            &self.config.token_url,
            &self.config.credentials.client_id,
            &self.config.credentials.client_secret,
        ))
    }

    /// Refreshes the access token of a bundle in place.
    ///
    /// Uses the token endpoint and client recorded in the bundle, so bundles
    /// issued under older settings keep working.
    pub async fn refresh(&self, bundle: &mut TokenBundle) -> ProviderResult<()> {
        let refresh_token = bundle
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::authentication("no refresh token - re-authorization required")
            })?;

        let params = [
            ("client_id", bundle.client_id.as_str()),
            ("client_secret", bundle.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let token_uri = bundle.token_uri.clone();
        let token_response = self
            .post_token_request(&token_uri, &params, "token refresh")
            .await?;

        bundle.update_access_token(token_response.access_token, token_response.expires_in);
        if let Some(rotated) = token_response.refresh_token {
            bundle.refresh_token = Some(rotated);
        }

        info!("successfully refreshed access token");
        Ok(())
    }

    async fn post_token_request(
        &self,
        url: &str,
        params: &[(&str, &str)],
        operation: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::transport(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(operation, e))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token endpoint returned {} during {}: {}",
                status, operation, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

/// RFC 7636 verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier = random_token(VERIFIER_BYTES);
        Self {
            challenge: Self::challenge_for(&verifier),
            verifier,
        }
    }

    /// `BASE64URL(SHA256(verifier))`, unpadded.
    pub fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Successful token endpoint body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Scopes actually granted, when the endpoint reports them.
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect::<Vec<_>>())
            .filter(|scopes| !scopes.is_empty())
    }
}
