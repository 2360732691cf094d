//! Upcoming event type shown on the calendar page.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// An event returned by the calendar listing, reduced to what the page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    /// Provider event identifier.
    pub id: String,
    /// The event title, if the event has one.
    pub summary: Option<String>,
    /// When the event starts.
    pub start: EventTime,
}

impl UpcomingEvent {
    /// Creates a new event with the given id and start.
    pub fn new(id: impl Into<String>, start: EventTime) -> Self {
        Self {
            id: id.into(),
            summary: None,
            start,
        }
    }

    /// Builder method to set the title.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Returns the title, or a placeholder for untitled events.
    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(no title)")
    }

    /// Returns `true` if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }
}
