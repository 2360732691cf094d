//! Calendar API v3 `events.list` over a bearer token.
//!
//! Knows nothing about refreshing; a 401 surfaces as
//! [`ProviderErrorCode::AuthenticationFailed`] for the caller to act on.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use tracing::{debug, warn};

use nextevents_core::{EventTime, UpcomingEvent};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// Query for the events.list endpoint.
#[derive(Debug, Clone)]
pub struct EventQuery {
    /// Calendar identifier (e.g., "primary").
    pub calendar_id: String,
    /// Sent as `timeMin`; no upper bound is sent.
    pub time_min: DateTime<Utc>,
    /// Page size sent as `maxResults`; also caps the result.
    pub max_results: usize,
    /// Whether to expand recurring events into single instances.
    pub single_events: bool,
}

impl EventQuery {
    /// Next events of a calendar from now on, recurring series expanded.
    pub fn upcoming(calendar_id: impl Into<String>, max_results: usize) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min: Utc::now(),
            max_results,
            single_events: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarClient {
    /// `base_url` is the API root, e.g. [`GoogleConfig::DEFAULT_CALENDAR_API_BASE`](super::GoogleConfig::DEFAULT_CALENDAR_API_BASE).
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Swaps in a refreshed access token.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Lists events from a calendar, ordered by start time.
    ///
    /// A single page is requested; `max_results` caps it.
    pub async fn list_events(&self, query: &EventQuery) -> ProviderResult<Vec<UpcomingEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&query.calendar_id)
        );

        let mut params = vec![
            (
                "timeMin",
                query.time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("maxResults", query.max_results.to_string()),
            ("singleEvents", query.single_events.to_string()),
        ];
        // The API only accepts startTime ordering for expanded series.
        if query.single_events {
            params.push(("orderBy", "startTime".to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::transport("event listing", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response, &query.calendar_id).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transport("reading event list", e))?;

        let list_response: EventsPage = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })?;

        let events: Vec<UpcomingEvent> = list_response
            .items
            .into_iter()
            .filter_map(convert_event)
            .take(query.max_results)
            .collect();

        debug!(
            "fetched {} events from calendar {}",
            events.len(),
            query.calendar_id
        );
        Ok(events)
    }
}

/// Turns a non-2xx Calendar API answer into an error, keeping what the
/// response says about it.
async fn status_error(
    status: StatusCode,
    response: reqwest::Response,
    calendar_id: &str,
) -> ProviderError {
    let code = ProviderErrorCode::for_status(status);
    let message = match code {
        ProviderErrorCode::AuthenticationFailed => "access token expired or invalid".to_string(),
        ProviderErrorCode::AuthorizationFailed => {
            format!("access to calendar '{}' denied", calendar_id)
        }
        ProviderErrorCode::NotFound => format!("calendar '{}' not found", calendar_id),
        ProviderErrorCode::RateLimited => match response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
        {
            Some(secs) => format!("rate limit exceeded, retry after {} seconds", secs),
            None => "rate limit exceeded".to_string(),
        },
        _ => {
            let body = response.text().await.unwrap_or_default();
            format!("API error ({}): {}", status, body)
        }
    };
    ProviderError::new(code, message)
}

/// Drops cancelled instances and events with no start at all.
///
/// A start value that is not valid RFC 3339 (or `YYYY-MM-DD`) is still
/// listed as sent.
fn convert_event(event: WireEvent) -> Option<UpcomingEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id.unwrap_or_default();
    let start = event
        .start
        .and_then(|start| EventTime::parse(start.date_time.as_deref(), start.date.as_deref()));
    let Some(start) = start else {
        warn!("event {} has no start time", id);
        return None;
    };
    if !start.is_well_formed() {
        warn!("event {} has a malformed start time '{}'", id, start);
    }

    let mut upcoming = UpcomingEvent::new(id, start);
    upcoming.summary = event.summary;
    Some(upcoming)
}

/// One page of `events.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: Option<String>,
    summary: Option<String>,
    start: Option<WireTime>,
    status: Option<String>,
}

/// `date` for all-day events, `dateTime` otherwise.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_with_one_event() {
        let page: EventsPage = serde_json::from_str(
            r#"{
                "kind": "calendar#events",
                "summary": "alice@example.com",
                "nextPageToken": "CiAKGjBpNDd2Nmp2Zml2cXRwYjBpOXA",
                "items": [{
                    "id": "7cbh8rpc10lrc0ckih9tafss99",
                    "summary": "Standup",
                    "htmlLink": "https://www.google.com/calendar/event?eid=N2NiaDhycGMx",
                    "start": {"dateTime": "2024-03-15T10:00:00Z"},
                    "end": {"dateTime": "2024-03-15T10:15:00Z"},
                    "status": "confirmed"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].summary.as_deref(), Some("Standup"));
    }

    #[test]
    fn parse_response_without_items() {
        let response: EventsPage =
            serde_json::from_str(r#"{"kind": "calendar#events"}"#).unwrap();
        assert!(response.items.is_empty());
    }

    #[test]
    fn convert_all_day_event() {
        let event: WireEvent = serde_json::from_str(
            r#"{"id": "holiday", "summary": "Public holiday",
                "start": {"date": "2024-03-15"}, "end": {"date": "2024-03-16"}}"#,
        )
        .unwrap();
        let upcoming = convert_event(event).unwrap();
        assert!(upcoming.is_all_day());
        assert_eq!(upcoming.start.to_string(), "2024-03-15");
    }

    #[test]
    fn convert_prefers_datetime() {
        let event: WireEvent = serde_json::from_str(
            r#"{"id": "tokyo", "start": {
                "date": "2024-03-15",
                "dateTime": "2024-03-15T10:00:00+09:00",
                "timeZone": "Asia/Tokyo"}}"#,
        )
        .unwrap();
        let upcoming = convert_event(event).unwrap();
        assert_eq!(upcoming.start.to_string(), "2024-03-15T10:00:00+09:00");
        assert_eq!(upcoming.title(), "(no title)");
    }

    #[test]
    fn convert_keeps_utc_suffix_and_fraction() {
        let event: WireEvent = serde_json::from_str(
            r#"{"id": "z", "start": {"dateTime": "2030-05-01T09:30:00.5Z"}}"#,
        )
        .unwrap();
        assert_eq!(convert_event(event).unwrap().start.to_string(), "2030-05-01T09:30:00.5Z");
    }

    #[test]
    fn convert_lists_malformed_start() {
        let event: WireEvent = serde_json::from_str(
            r#"{"id": "m", "summary": "Odd", "start": {"dateTime": "2030-05-01 morning"}}"#,
        )
        .unwrap();
        let upcoming = convert_event(event).unwrap();
        assert_eq!(upcoming.start.to_string(), "2030-05-01 morning");
        assert!(!upcoming.is_all_day());
        assert!(!upcoming.start.is_well_formed());
    }

    #[test]
    fn convert_skips_cancelled_and_timeless() {
        let cancelled: WireEvent = serde_json::from_str(
            r#"{"id": "c", "status": "cancelled", "start": {"date": "2024-03-15"}}"#,
        )
        .unwrap();
        assert!(convert_event(cancelled).is_none());

        let timeless: WireEvent = serde_json::from_str(r#"{"id": "t", "start": {}}"#).unwrap();
        assert!(convert_event(timeless).is_none());

        let startless: WireEvent = serde_json::from_str(r#"{"id": "s"}"#).unwrap();
        assert!(convert_event(startless).is_none());
    }

    #[test]
    fn upcoming_query_defaults() {
        let query = EventQuery::upcoming("primary", 10);
        assert_eq!(query.calendar_id, "primary");
        assert_eq!(query.max_results, 10);
        assert!(query.single_events);
        assert!((Utc::now() - query.time_min).num_seconds() < 5);
    }
}
