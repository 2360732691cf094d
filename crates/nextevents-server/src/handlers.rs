//! HTTP handlers for the four routes.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use tracing::{debug, info, warn};

use nextevents_core::{render_authorized, render_events, render_home, render_missing_credentials};

use crate::calendar::{CalendarPage, list_upcoming};
use crate::error::AppError;
use crate::session::OAuthSession;
use crate::state::AppState;

/// Query string carrying an optional user identifier.
#[derive(Debug, Default, Deserialize)]
pub struct UidQuery {
    pub uid: Option<String>,
}

impl UidQuery {
    fn uid(&self) -> Option<&str> {
        self.uid.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// `GET /`
pub async fn home(State(state): State<AppState>) -> Html<String> {
    Html(render_home(
        &state.config.google.redirect_uri,
        state.config.default_user_id.is_none(),
    ))
}

/// `GET /authorize`
///
/// Stores state, PKCE verifier and user identifier in the session cookie,
/// then redirects the browser to Google.
pub async fn authorize(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<UidQuery>,
) -> Result<Response, AppError> {
    let user_id = query
        .uid()
        .map(String::from)
        .or_else(|| state.config.default_user_id.clone())
        .ok_or(AppError::MissingParameter("uid"))?;

    let request = state.provider.oauth().authorization_request();
    let session = OAuthSession {
        state: request.state,
        code_verifier: request.code_verifier,
        user_id,
    };
    info!(user_id = %session.user_id, "starting authorization");

    let jar = jar.add(session.to_cookie(state.secure_cookies()));
    Ok((jar, found(&request.url)).into_response())
}

/// `GET /oauth2callback`
pub async fn oauth2callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    let Some(session) = OAuthSession::from_jar(&jar) else {
        warn!("callback without a session, sending the browser home");
        return Ok(found("/"));
    };

    let callback = callback_url(&headers, &uri);
    info!(path = uri.path(), "oauth callback received");
    debug!(url = %callback, "reconstructed callback URL");

    let params = CallbackParams::parse(&callback, &uri);
    if let Some(error) = params.error {
        return Err(AppError::CallbackRejected(match params.error_description {
            Some(description) => format!("authorization failed: {} ({})", error, description),
            None => format!("authorization failed: {}", error),
        }));
    }
    let Some(code) = params.code else {
        return Err(AppError::CallbackRejected(
            "authorization code missing from callback".to_string(),
        ));
    };
    if params.state.as_deref() != Some(session.state.as_str()) {
        return Err(AppError::CallbackRejected(
            "state mismatch: the authorization response does not belong to this session"
                .to_string(),
        ));
    }

    let bundle = state
        .provider
        .oauth()
        .exchange_code(&code, &session.code_verifier)
        .await
        .map_err(AppError::TokenExchange)?;
    if bundle.refresh_token.is_none() {
        warn!(user_id = %session.user_id, "no refresh token granted");
    }

    let json = bundle.to_json().map_err(AppError::Credential)?;
    state.store.upsert(&session.user_id, &json).await?;
    info!(
        user_id = %session.user_id,
        token = bundle.access_token_prefix(),
        "authorization complete"
    );

    let jar = jar.remove(OAuthSession::removal_cookie());
    Ok((jar, Html(render_authorized())).into_response())
}

/// `GET /calendar`
pub async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> Result<Response, AppError> {
    let page = list_upcoming(&state.store, &state.provider, query.uid()).await?;
    Ok(match page {
        CalendarPage::NoCredential => Html(render_missing_credentials()).into_response(),
        CalendarPage::Events(events) => Html(render_events(&events)).into_response(),
    })
}

/// 302 to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Rebuilds the URL the browser requested, as seen in front of any proxy.
pub fn callback_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = first_header_value(headers, "x-forwarded-proto").unwrap_or("http");
    let host = first_header_value(headers, "x-forwarded-host")
        .or_else(|| first_header_value(headers, header::HOST.as_str()))
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());

    format!("{}://{}{}", scheme, host, path)
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Parameters of the provider redirect.
#[derive(Debug, Default, PartialEq, Eq)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    /// Reads the parameters from the reconstructed URL, or from the raw
    /// request query when forwarded headers made that URL unparseable.
    fn parse(callback: &str, uri: &Uri) -> Self {
        let query = match url::Url::parse(callback) {
            Ok(url) => url.query().unwrap_or_default().to_string(),
            Err(e) => {
                warn!(url = %callback, "unparseable callback URL: {}", e);
                uri.query().unwrap_or_default().to_string()
            }
        };

        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}
