//! Web server: Google OAuth authorization flow and upcoming events page.
//!
//! Routes:
//! - `GET /` - landing page with the redirect URI and a link to start
//! - `GET /authorize` - redirects to Google's consent screen
//! - `GET /oauth2callback` - exchanges the code and stores the credential
//! - `GET /calendar` - lists the next events of the stored credential
//!
//! # Example
//!
//! ```rust,no_run
//! use nextevents_server::{AppConfig, AppState, Args, build_router};
//! use nextevents_store::CredentialStore;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_args(&Args::parse())?;
//!     let store = CredentialStore::connect(&config.database_url).await?;
//!     store.migrate().await?;
//!
//!     let addr = config.bind_addr()?;
//!     let router = build_router(AppState::new(config, store)?);
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

mod calendar;
mod config;
mod error;
mod handlers;
mod session;
mod signals;
mod state;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub use calendar::{CalendarPage, list_upcoming};
pub use config::{AppConfig, Args};
pub use error::{AppError, ServerError, ServerResult};
pub use handlers::callback_url;
pub use session::{COOKIE_NAME, OAuthSession, signing_key};
pub use signals::shutdown_signal;
pub use state::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/authorize", get(handlers::authorize))
        .route("/oauth2callback", get(handlers::oauth2callback))
        .route("/calendar", get(handlers::calendar))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
