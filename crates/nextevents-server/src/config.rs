//! Server configuration.
//!
//! Values come from command-line flags, falling back to environment variables
//! (a `.env` file in the working directory is loaded first by the binary).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, warn};

use nextevents_core::{TracingConfig, TracingOutputFormat};
use nextevents_providers::google::{GoogleConfig, OAuthCredentials};

use crate::error::{ServerError, ServerResult};

/// Secrets shorter than this still work but are reported at startup.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// nextevents - Google Calendar upcoming events over OAuth
#[derive(Debug, Clone, Parser)]
#[command(name = "nextevents")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Google OAuth client ID
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Google Cloud Console credentials JSON (used when client ID/secret are unset)
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Redirect URI registered for the OAuth client
    #[arg(long, env = "GOOGLE_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Secret used to sign the session cookie
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Database URL (sqlite:... or postgres://...)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// User identifier used when /authorize gets no uid
    #[arg(long, env = "DEFAULT_USER_ID")]
    pub default_user_id: Option<String>,

    /// Timeout for requests to Google, in seconds
    #[arg(long, env = "NEXTEVENTS_HTTP_TIMEOUT", default_value_t = 30)]
    pub http_timeout: u64,

    /// Log output format (pretty, compact, json)
    #[arg(long, env = "NEXTEVENTS_LOG_FORMAT", default_value = "pretty")]
    pub log_format: TracingOutputFormat,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[arg(long, env = "GOOGLE_AUTH_URI", default_value = GoogleConfig::DEFAULT_AUTH_URL, hide = true)]
    pub auth_uri: String,

    #[arg(long, env = "GOOGLE_TOKEN_URI", default_value = GoogleConfig::DEFAULT_TOKEN_URL, hide = true)]
    pub token_uri: String,

    #[arg(long, env = "GOOGLE_CALENDAR_API", default_value = GoogleConfig::DEFAULT_CALENDAR_API_BASE, hide = true)]
    pub calendar_api: String,
}

impl Args {
    /// Returns the tracing configuration selected by the flags.
    pub fn tracing_config(&self) -> TracingConfig {
        if self.debug {
            TracingConfig::debug()
                .with_level(Level::DEBUG)
                .with_format(self.log_format)
        } else {
            TracingConfig::server().with_format(self.log_format)
        }
    }
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Google OAuth and Calendar settings.
    pub google: GoogleConfig,
    /// Secret the session cookie signing key is derived from.
    pub secret_key: String,
    /// Credential store URL.
    pub database_url: String,
    /// Listening host.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Identifier used when `/authorize` is called without `uid`.
    pub default_user_id: Option<String>,
}

impl AppConfig {
    /// Validates the flags and builds the configuration.
    pub fn from_args(args: &Args) -> ServerResult<Self> {
        let mut credentials = load_credentials(args)?;

        let redirect_uri = non_empty(args.redirect_uri.as_deref())
            .map(String::from)
            .or_else(|| credentials.redirect_uris.first().cloned())
            .ok_or_else(|| ServerError::config("GOOGLE_REDIRECT_URI must be set"))?;
        credentials.redirect_uris.clear();

        let secret_key = non_empty(args.secret_key.as_deref())
            .ok_or_else(|| ServerError::config("SECRET_KEY must be set"))?
            .to_string();
        if secret_key.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                "SECRET_KEY is shorter than {} characters, consider a longer value",
                RECOMMENDED_SECRET_LEN
            );
        }

        let database_url = non_empty(args.database_url.as_deref())
            .ok_or_else(|| ServerError::config("DATABASE_URL must be set"))?
            .to_string();

        let google = GoogleConfig::new(credentials, redirect_uri)
            .with_auth_url(&args.auth_uri)
            .with_token_url(&args.token_uri)
            .with_calendar_api_base(&args.calendar_api)
            .with_timeout(Duration::from_secs(args.http_timeout));
        google.validate().map_err(ServerError::config)?;

        Ok(Self {
            google,
            secret_key,
            database_url,
            host: args.host.clone(),
            port: args.port,
            default_user_id: non_empty(args.default_user_id.as_deref()).map(String::from),
        })
    }

    /// Returns the socket address to listen on.
    pub fn bind_addr(&self) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .or_else(|_| format!("[{}]:{}", self.host, self.port).parse::<SocketAddr>())
            .map_err(|e| ServerError::config(format!("invalid listen address '{}': {}", self.host, e)))
    }
}

fn load_credentials(args: &Args) -> ServerResult<OAuthCredentials> {
    let client_id = non_empty(args.client_id.as_deref());
    let client_secret = non_empty(args.client_secret.as_deref());

    match (client_id, client_secret, &args.credentials_file) {
        (Some(id), Some(secret), _) => Ok(OAuthCredentials::new(id, secret)),
        (None, None, Some(path)) => OAuthCredentials::from_file(path)
            .map_err(|e| ServerError::config(format!("{}: {}", path.display(), e))),
        (Some(_), None, _) => Err(ServerError::config("GOOGLE_CLIENT_SECRET must be set")),
        (None, Some(_), _) => Err(ServerError::config("GOOGLE_CLIENT_ID must be set")),
        (None, None, None) => Err(ServerError::config(
            "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET (or GOOGLE_CREDENTIALS_FILE) must be set",
        )),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
