use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nextevents_providers::google::TokenBundle;
use nextevents_server::{AppConfig, AppState, Args, COOKIE_NAME, build_router};
use nextevents_store::CredentialStore;

const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
const REDIRECT_URI: &str = "http://localhost:8000/oauth2callback";

struct TestApp {
    router: Router,
    store: CredentialStore,
    google: MockServer,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_args(&[]).await
    }

    async fn with_args(extra: &[&str]) -> Self {
        let google = MockServer::start().await;
        let store = CredentialStore::connect("sqlite::memory:").await.unwrap();
        store.migrate().await.unwrap();

        let auth_uri = format!("{}/o/oauth2/auth", google.uri());
        let token_uri = format!("{}/token", google.uri());
        let calendar_api = google.uri();
        let mut argv = vec![
            "nextevents",
            "--client-id",
            CLIENT_ID,
            "--client-secret",
            "test-secret",
            "--redirect-uri",
            REDIRECT_URI,
            "--secret-key",
            "a test secret that is long enough to sign cookies",
            "--database-url",
            "sqlite::memory:",
            "--auth-uri",
            auth_uri.as_str(),
            "--token-uri",
            token_uri.as_str(),
            "--calendar-api",
            calendar_api.as_str(),
        ];
        argv.extend_from_slice(extra);

        let config = AppConfig::from_args(&Args::try_parse_from(argv).unwrap()).unwrap();
        let state = AppState::new(config, store.clone()).unwrap();

        Self {
            router: build_router(state),
            store,
            google,
        }
    }

    async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response {
        self.request(
            Request::get(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Runs `/authorize` and returns the session cookie and the state sent to Google.
    async fn start_authorization(&self, uid: &str) -> (String, String) {
        let response = self.get(&format!("/authorize?uid={}", uid)).await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let cookie = set_cookie(&response)
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let location = url::Url::parse(location(&response)).unwrap();
        let state = location
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        (cookie, state)
    }

    fn token_uri(&self) -> String {
        format!("{}/token", self.google.uri())
    }

    async fn seed(&self, user_id: &str, bundle: &TokenBundle) {
        self.store
            .upsert(user_id, &bundle.to_json().unwrap())
            .await
            .unwrap();
    }

    fn bundle(&self, access_token: &str) -> TokenBundle {
        TokenBundle::new(
            access_token,
            Some("refresh-1".to_string()),
            Some(3600),
            vec![],
        )
        .with_client(self.token_uri(), CLIENT_ID, "test-secret")
    }
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn set_cookie(response: &Response) -> &str {
    response.headers()[header::SET_COOKIE].to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn mock_token_exchange(server: &MockServer, access_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "refresh_token": "refresh-1",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/calendar.readonly",
            "token_type": "Bearer"
        })))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

async fn mock_events(server: &MockServer, access_token: &str, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header_is("authorization", format!("Bearer {}", access_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn home_shows_redirect_uri_and_uid_form() {
    let app = TestApp::new().await;
    let response = app.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(REDIRECT_URI));
    assert!(body.contains("name=\"uid\""));
}

#[tokio::test]
async fn calendar_on_fresh_database_prompts_for_authorization() {
    let app = TestApp::new().await;
    let response = app.get("/calendar").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("No stored credentials"));
    assert!(body.contains("href=\"/\""));

    // The prompt's link leads to a page that can start the flow without a
    // configured default user.
    let landing = app.get("/").await;
    assert_eq!(landing.status(), StatusCode::OK);
    let landing = body_text(landing).await;
    assert!(landing.contains("action=\"/authorize\""));
    assert!(landing.contains("name=\"uid\""));

    let started = app.get("/authorize?uid=alice").await;
    assert_eq!(started.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn missing_credential_prompt_reaches_authorize_with_default_user() {
    let app = TestApp::with_args(&["--default-user-id", "me"]).await;
    let body = body_text(app.get("/calendar").await).await;
    assert!(body.contains("href=\"/\""));

    let landing = body_text(app.get("/").await).await;
    assert!(landing.contains("<a href=\"/authorize\">"));
    assert_eq!(app.get("/authorize").await.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn authorize_without_uid_is_rejected() {
    let app = TestApp::new().await;
    let response = app.get("/authorize").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_text(response).await, "missing required parameter: uid");
}

#[tokio::test]
async fn authorize_redirects_to_google_with_session_cookie() {
    let app = TestApp::new().await;
    let response = app.get("/authorize?uid=alice").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let url = url::Url::parse(location(&response)).unwrap();
    assert_eq!(url.path(), "/o/oauth2/auth");
    let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(query["client_id"], CLIENT_ID);
    assert_eq!(query["redirect_uri"], REDIRECT_URI);
    assert_eq!(
        query["scope"],
        "https://www.googleapis.com/auth/calendar.readonly"
    );
    assert_eq!(query["access_type"], "offline");
    assert_eq!(query["prompt"], "consent");
    assert_eq!(query["include_granted_scopes"], "true");
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(!query["state"].is_empty());
    assert!(!query["code_challenge"].is_empty());

    let cookie = set_cookie(&response);
    assert!(cookie.starts_with(&format!("{}=", COOKIE_NAME)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn default_user_id_makes_uid_optional() {
    let app = TestApp::with_args(&["--default-user-id", "me"]).await;

    let home = body_text(app.get("/").await).await;
    assert!(!home.contains("name=\"uid\""));

    let response = app.get("/authorize").await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn callback_stores_credential_and_clears_session() {
    let app = TestApp::new().await;
    mock_token_exchange(&app.google, "access-1", 1).await;

    let (cookie, state) = app.start_authorization("alice").await;
    let response = app
        .get_with_cookie(
            &format!("/oauth2callback?code=auth-code&state={}", state),
            &cookie,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let removal = set_cookie(&response).to_string();
    assert!(removal.starts_with(&format!("{}=", COOKIE_NAME)));
    assert!(removal.contains("Max-Age=0") || removal.contains("Expires="));
    assert!(body_text(response).await.contains("href=\"/calendar\""));

    let record = app.store.get("alice").await.unwrap().unwrap();
    let bundle = TokenBundle::from_json(&record.token_json).unwrap();
    assert_eq!(bundle.access_token, "access-1");
    assert_eq!(bundle.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(bundle.client_id, CLIENT_ID);
}

#[tokio::test]
async fn repeated_authorization_keeps_one_row() {
    let app = TestApp::new().await;
    mock_token_exchange(&app.google, "access-1", 1).await;
    mock_token_exchange(&app.google, "access-2", 1).await;

    let (cookie, state) = app.start_authorization("alice").await;
    let response = app
        .get_with_cookie(&format!("/oauth2callback?code=c1&state={}", state), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = app.store.get("alice").await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;

    let (cookie, state) = app.start_authorization("alice").await;
    let response = app
        .get_with_cookie(&format!("/oauth2callback?code=c2&state={}", state), &cookie)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = app.store.get("alice").await.unwrap().unwrap();

    assert_eq!(app.store.count().await.unwrap(), 1);
    assert_ne!(first.token_json, second.token_json);
    assert_eq!(first.created_at, second.created_at);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn callback_without_session_redirects_home() {
    let app = TestApp::new().await;
    let response = app.get("/oauth2callback?code=abc&state=xyz").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn tampered_session_cookie_is_ignored() {
    let app = TestApp::new().await;
    let (cookie, state) = app.start_authorization("alice").await;

    let mut tampered = cookie.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = app
        .get_with_cookie(&format!("/oauth2callback?code=abc&state={}", state), &tampered)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn state_mismatch_is_rejected() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.google)
        .await;

    let (cookie, _state) = app.start_authorization("alice").await;
    let response = app
        .get_with_cookie("/oauth2callback?code=abc&state=forged", &cookie)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("state mismatch"));
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn provider_error_is_rejected() {
    let app = TestApp::new().await;
    let (cookie, state) = app.start_authorization("alice").await;

    let response = app
        .get_with_cookie(
            &format!("/oauth2callback?error=access_denied&state={}", state),
            &cookie,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("access_denied"));
}

#[tokio::test]
async fn missing_code_is_rejected() {
    let app = TestApp::new().await;
    let (cookie, state) = app.start_authorization("alice").await;

    let response = app
        .get_with_cookie(&format!("/oauth2callback?state={}", state), &cookie)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("authorization code missing"));
}

#[tokio::test]
async fn failed_exchange_reports_upstream_error() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
        )
        .mount(&app.google)
        .await;

    let (cookie, state) = app.start_authorization("alice").await;
    let response = app
        .get_with_cookie(&format!("/oauth2callback?code=used&state={}", state), &cookie)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.starts_with("token exchange failed:"));
    assert!(body.contains("invalid_grant"));
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn calendar_without_events() {
    let app = TestApp::new().await;
    app.seed("alice", &app.bundle("access-1")).await;
    mock_events(&app.google, "access-1", json!([])).await;

    let response = app.get("/calendar").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No upcoming events"));
}

#[tokio::test]
async fn calendar_lists_date_only_events() {
    let app = TestApp::new().await;
    app.seed("alice", &app.bundle("access-1")).await;
    mock_events(
        &app.google,
        "access-1",
        json!([
            {"id": "1", "summary": "Release <v2>", "start": {"dateTime": "2030-05-01T09:30:00Z"}},
            {"id": "2", "summary": "Offsite", "start": {"date": "2030-05-02"}},
            {"id": "3", "start": {"date": "2030-05-03"}}
        ]),
    )
    .await;

    let body = body_text(app.get("/calendar").await).await;

    assert!(body.contains("<h1>Upcoming events</h1>"));
    assert!(body.contains("<li>2030-05-01T09:30:00Z - Release &lt;v2&gt;</li>"));
    assert!(body.contains("<li>2030-05-02 - Offsite</li>"));
    assert!(body.contains("<li>2030-05-03 - (no title)</li>"));
}

#[tokio::test]
async fn calendar_uid_selects_credential() {
    let app = TestApp::new().await;
    app.seed("alice", &app.bundle("alice-token")).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    app.seed("bob", &app.bundle("bob-token")).await;

    mock_events(
        &app.google,
        "alice-token",
        json!([{"id": "a", "summary": "Alice only", "start": {"date": "2030-01-01"}}]),
    )
    .await;
    mock_events(
        &app.google,
        "bob-token",
        json!([{"id": "b", "summary": "Bob only", "start": {"date": "2030-01-01"}}]),
    )
    .await;

    assert!(body_text(app.get("/calendar").await).await.contains("Bob only"));
    assert!(
        body_text(app.get("/calendar?uid=alice").await)
            .await
            .contains("Alice only")
    );
    assert!(
        body_text(app.get("/calendar?uid=carol").await)
            .await
            .contains("No stored credentials")
    );
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let app = TestApp::new().await;
    let mut bundle = app.bundle("stale");
    bundle.expiry = Some(Utc::now() - chrono::Duration::minutes(10));
    app.seed("alice", &bundle).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&app.google)
        .await;
    mock_events(
        &app.google,
        "fresh",
        json!([{"id": "1", "summary": "Planning", "start": {"date": "2030-02-01"}}]),
    )
    .await;

    let body = body_text(app.get("/calendar").await).await;
    assert!(body.contains("Planning"));

    let record = app.store.get("alice").await.unwrap().unwrap();
    let stored = TokenBundle::from_json(&record.token_json).unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    assert!(!stored.is_expired());
}

#[tokio::test]
async fn calendar_api_failure_is_server_error() {
    let app = TestApp::new().await;
    app.seed("alice", &app.bundle("access-1")).await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .expect(1)
        .mount(&app.google)
        .await;

    let response = app.get("/calendar").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert_eq!(body, "calendar request failed");
}

#[tokio::test]
async fn corrupt_stored_credential_is_server_error() {
    let app = TestApp::new().await;
    app.store.upsert("alice", "not json").await.unwrap();

    let response = app.get("/calendar").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
