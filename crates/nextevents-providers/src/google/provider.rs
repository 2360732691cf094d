//! Google Calendar provider.
//!
//! Ties the OAuth client and the Calendar API client together around a
//! caller-owned [`TokenBundle`].

use tracing::{debug, info, warn};

use nextevents_core::UpcomingEvent;

use crate::error::{ProviderError, ProviderResult};

use super::client::{EventQuery, GoogleCalendarClient};
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenBundle;

/// Result of listing upcoming events.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Events in start-time order.
    pub events: Vec<UpcomingEvent>,
    /// Whether the access token was refreshed along the way.
    pub refreshed: bool,
}

/// Google Calendar provider.
///
/// Holds one shared HTTP client; cloning is cheap.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
    oauth_client: OAuthClient,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    /// Creates a new Google provider with the given configuration.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to build HTTP client: {}", e))
                    .with_source(e)
            })?;

        let oauth_client = OAuthClient::new(config.clone(), http_client.clone());

        Ok(Self {
            config,
            oauth_client,
            http_client,
        })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Returns the OAuth client.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth_client
    }

    /// Lists the next events of the configured calendar.
    ///
    /// An expired bundle is refreshed first when it can be. If the API still
    /// rejects the token, the bundle is refreshed and the call repeated once.
    /// The bundle is updated in place; callers persist it afterwards.
    pub async fn fetch_upcoming(&self, bundle: &mut TokenBundle) -> ProviderResult<FetchOutcome> {
        let mut refreshed = false;

        if bundle.is_expired() {
            if bundle.can_refresh() {
                debug!("refreshing expired access token");
                self.oauth_client.refresh(bundle).await?;
                refreshed = true;
            } else {
                warn!("access token expired and no refresh token stored");
            }
        }

        let query = EventQuery::upcoming(&self.config.calendar_id, self.config.max_results);
        let mut client = GoogleCalendarClient::new(
            self.http_client.clone(),
            &self.config.calendar_api_base,
            &bundle.access_token,
        );

        let events = match client.list_events(&query).await {
            Ok(events) => events,
            Err(e) if e.is_unauthorized() && !refreshed && bundle.can_refresh() => {
                info!("access token rejected, refreshing and retrying once");
                self.oauth_client.refresh(bundle).await?;
                refreshed = true;
                client.set_access_token(&bundle.access_token);
                client.list_events(&query).await?
            }
            Err(e) => return Err(e),
        };

        Ok(FetchOutcome { events, refreshed })
    }
}
