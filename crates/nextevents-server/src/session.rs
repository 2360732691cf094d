//! Per-browser OAuth session, carried in a signed cookie.
//!
//! The cookie lives for one authorization round trip: `/authorize` sets it,
//! `/oauth2callback` consumes it. A cookie whose signature does not verify is
//! treated as absent.

use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::debug;

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "nextevents_oauth";

/// State kept between `/authorize` and `/oauth2callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSession {
    /// Anti-forgery state sent to the provider.
    pub state: String,
    /// PKCE verifier for the code exchange.
    pub code_verifier: String,
    /// Identifier the credential will be stored under.
    pub user_id: String,
}

impl OAuthSession {
    /// Reads the session from a verified cookie jar.
    pub fn from_jar(jar: &SignedCookieJar) -> Option<Self> {
        let cookie = jar.get(COOKIE_NAME)?;
        let decoded = URL_SAFE_NO_PAD.decode(cookie.value()).ok()?;
        match serde_json::from_slice(&decoded) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!("ignoring malformed session cookie: {}", e);
                None
            }
        }
    }

    /// Builds the cookie holding this session.
    pub fn to_cookie(&self, secure: bool) -> Cookie<'static> {
        // Serializing plain strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        Cookie::build((COOKIE_NAME, URL_SAFE_NO_PAD.encode(json)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .build()
    }

    /// Cookie matching the session cookie, for removal.
    pub fn removal_cookie() -> Cookie<'static> {
        Cookie::build((COOKIE_NAME, "")).path("/").build()
    }
}

/// Derives the cookie signing key from the configured secret.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
