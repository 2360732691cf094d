//! HTML rendering for the web pages.
//!
//! Pages are small fragments; every value that comes from a user or from the
//! calendar provider goes through [`html_escape`].

use crate::event::UpcomingEvent;

/// Escapes HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Renders the landing page.
///
/// When `uid_required` is set the page offers a form for the user identifier,
/// otherwise a plain link starts the flow.
pub fn render_home(redirect_uri: &str, uid_required: bool) -> String {
    let start = if uid_required {
        "<form action=\"/authorize\" method=\"get\">\
         <label>User ID <input name=\"uid\" required></label> \
         <button type=\"submit\">Connect Google Calendar</button></form>"
            .to_string()
    } else {
        "<a href=\"/authorize\">Connect Google Calendar</a>".to_string()
    };
    format!(
        "<h1>Google Calendar OAuth</h1><p>Redirect URL: {}</p>{}",
        html_escape(redirect_uri),
        start
    )
}

/// Renders the page shown after a successful authorization.
pub fn render_authorized() -> String {
    "<h1>Authorization successful</h1>\
     <p>Google Calendar is now linked.</p>\
     <a href=\"/calendar\">Show calendar</a>"
        .to_string()
}

/// Renders the prompt shown when no credential has been stored yet.
///
/// Links to the landing page, which asks for the user identifier when
/// `/authorize` needs one.
pub fn render_missing_credentials() -> String {
    "No stored credentials. <a href=\"/\">Authorize</a>".to_string()
}

/// Renders the page shown when the calendar has no upcoming events.
pub fn render_no_events() -> String {
    "<h1>No upcoming events</h1>".to_string()
}

/// Renders the list of upcoming events, one `<li>` per event.
///
/// An empty slice renders [`render_no_events`].
pub fn render_events(events: &[UpcomingEvent]) -> String {
    if events.is_empty() {
        return render_no_events();
    }

    let items: String = events
        .iter()
        .map(|event| {
            format!(
                "<li>{} - {}</li>",
                html_escape(&event.start.to_string()),
                html_escape(event.title())
            )
        })
        .collect();

    format!("<h1>Upcoming events</h1><ul>{}</ul>", items)
}
