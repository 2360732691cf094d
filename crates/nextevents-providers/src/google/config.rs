//! OAuth client credentials and endpoint settings.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// A registered Google OAuth client.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URIs listed in a downloaded `client_secret.json`, if any.
    pub redirect_uris: Vec<String>,
}

/// Shapes of `client_secret.json` we accept: the Cloud Console download
/// (`web` or `installed` section) or a bare object with the two keys.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClientSecretFile {
    Web { web: ClientSection },
    Installed { installed: ClientSection },
    Flat(ClientSection),
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uris: Vec::new(),
        }
    }

    /// Reads a `client_secret.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            if e.is_syntax() || e.is_eof() {
                format!("client secret file is not valid JSON: {}", e)
            } else {
                "client secret file needs a 'web' or 'installed' section, \
                 or client_id and client_secret at the top level"
                    .to_string()
            }
        })?;

        let section = match file {
            ClientSecretFile::Web { web } => web,
            ClientSecretFile::Installed { installed } => installed,
            ClientSecretFile::Flat(section) => section,
        };
        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_uris: section.redirect_uris,
        })
    }

    /// Rejects obviously wrong values before Google gets to see them.
    pub fn validate(&self) -> Result<(), &'static str> {
        match (self.client_id.as_str(), self.client_secret.as_str()) {
            ("", _) => Err("client_id is required"),
            (id, _) if !id.ends_with(".apps.googleusercontent.com") => {
                Err("client_id should end with .apps.googleusercontent.com")
            }
            (_, "") => Err("client_secret is required"),
            _ => Ok(()),
        }
    }
}

/// Everything needed to talk to Google on behalf of this app.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,
    /// Sent on both the consent URL and the code exchange; must match the
    /// value registered for the client exactly.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    /// Also stored in every token bundle.
    pub token_url: String,
    pub calendar_api_base: String,
    pub calendar_id: String,
    /// Events shown on the calendar page.
    pub max_results: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl GoogleConfig {
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/auth";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const DEFAULT_CALENDAR_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Read-only access to the primary calendar, next 10 events.
    pub fn new(credentials: OAuthCredentials, redirect_uri: impl Into<String>) -> Self {
        Self {
            credentials,
            redirect_uri: redirect_uri.into(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            calendar_api_base: Self::DEFAULT_CALENDAR_API_BASE.to_string(),
            calendar_id: "primary".to_string(),
            max_results: 10,
            timeout: Duration::from_secs(30),
            user_agent: format!("nextevents/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_calendar_api_base(mut self, url: impl Into<String>) -> Self {
        self.calendar_api_base = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cookies should be `Secure` when the app is reached over HTTPS.
    pub fn redirect_is_https(&self) -> bool {
        self.redirect_uri.starts_with("https://")
    }

    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        if self.max_results == 0 {
            return Err("max_results must be at least 1".to_string());
        }

        for (name, value) in [
            ("redirect URI", &self.redirect_uri),
            ("authorization endpoint", &self.auth_url),
            ("token endpoint", &self.token_url),
            ("calendar API base", &self.calendar_api_base),
        ] {
            url::Url::parse(value).map_err(|e| format!("invalid {} '{}': {}", name, value, e))?;
        }
        Ok(())
    }
}
