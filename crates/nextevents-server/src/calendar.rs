//! Calendar reader: stored credential in, upcoming events out.

use tracing::{debug, info};

use nextevents_core::UpcomingEvent;
use nextevents_providers::google::{GoogleProvider, TokenBundle};
use nextevents_store::CredentialStore;

use crate::error::AppError;

/// What the calendar page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarPage {
    /// Nothing stored yet; the user has to authorize first.
    NoCredential,
    /// Upcoming events, possibly none.
    Events(Vec<UpcomingEvent>),
}

/// Lists the upcoming events of `user_id`, or of the most recently updated
/// credential when no identifier is given.
///
/// The token bundle is written back after a successful listing, and also
/// after a failed one if a refresh already replaced the access token.
pub async fn list_upcoming(
    store: &CredentialStore,
    provider: &GoogleProvider,
    user_id: Option<&str>,
) -> Result<CalendarPage, AppError> {
    let record = match user_id {
        Some(user_id) => store.get(user_id).await?,
        None => store.latest().await?,
    };
    let Some(record) = record else {
        debug!(?user_id, "no stored credential");
        return Ok(CalendarPage::NoCredential);
    };

    let mut bundle = TokenBundle::from_json(&record.token_json).map_err(AppError::Credential)?;
    let before = bundle.clone();

    let result = provider.fetch_upcoming(&mut bundle).await;
    if result.is_ok() || bundle != before {
        let json = bundle.to_json().map_err(AppError::Credential)?;
        store.upsert(&record.user_id, &json).await?;
    }

    let outcome = result.map_err(AppError::Calendar)?;
    info!(
        user_id = %record.user_id,
        events = outcome.events.len(),
        refreshed = outcome.refreshed,
        "listed upcoming events"
    );
    Ok(CalendarPage::Events(outcome.events))
}
