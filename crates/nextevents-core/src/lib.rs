//! Core types: event times, upcoming events, page rendering, tracing

pub mod event;
pub mod format;
pub mod time;
pub mod tracing;

pub use event::UpcomingEvent;
pub use format::{
    html_escape, render_authorized, render_events, render_home, render_missing_credentials,
    render_no_events,
};
pub use time::EventTime;
pub use self::tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
