mod common;

use std::sync::Arc;
use std::time::Duration;

use shortlink_client::form::controller::SubmissionController;
use shortlink_client::form::form_model::Phase;
use shortlink_client::form::outcome::{RemoteOutcome, SubmissionError};
use shortlink_client::remote::actions::{
    HistoryAction, LoginAction, RegisterAction, ShortenAction, requested_expiration,
};
use shortlink_client::remote::client::{Endpoints, ServiceClient, rejection_message};
use shortlink_client::remote::error::RemoteError;
use shortlink_client::remote::remote_model::{HistoryEntry, RemoteAction};
use shortlink_client::session::store::{AUTH_COOKIE, CookieSession, JWT_COOKIE, SessionStore};
use shortlink_client::validate::forms::{field, login_rules};

use common::{dead_base_url, fields, serve_once};

fn client_for(base: &str, session: Arc<CookieSession>) -> Arc<ServiceClient> {
    let endpoints = Endpoints::from_bases(base, base, base).unwrap();
    Arc::new(ServiceClient::new(endpoints, session, Duration::from_secs(5)).unwrap())
}

fn body_of(request: &str) -> &str {
    request.split("\r\n\r\n").nth(1).unwrap_or("")
}

// ============================================================================
// Auth service
// ============================================================================

#[tokio::test]
async fn login_success_stores_session_cookies() {
    let (base, server) = serve_once(
        "200 OK",
        &["Set-Cookie: auth=pass; Path=/", "Set-Cookie: JWT=signed; HttpOnly"],
        r#"{"message":"success"}"#,
    )
    .await;
    let session = Arc::new(CookieSession::new());
    let action = LoginAction::new(client_for(&base, session.clone()));

    let outcome = action
        .perform(&fields(&[(field::EMAIL, "a@b.co"), (field::PASSWORD, "password1")]))
        .await
        .unwrap();

    assert_eq!(outcome, RemoteOutcome::Success("success".to_string()));
    assert!(session.is_authenticated());
    assert_eq!(session.cookie(JWT_COOKIE).as_deref(), Some("signed"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /login "));
    let body: serde_json::Value = serde_json::from_str(body_of(&request)).unwrap();
    assert_eq!(body["email"], "a@b.co");
    assert_eq!(body["password"], "password1");
}

#[tokio::test]
async fn register_conflict_is_server_error() {
    let (base, server) = serve_once(
        "409 Conflict",
        &[],
        r#"{"message":"user already exists"}"#,
    )
    .await;
    let action = RegisterAction::new(client_for(&base, Arc::new(CookieSession::new())));

    let outcome = action
        .perform(&fields(&[
            (field::NAME, "Ada"),
            (field::EMAIL, "ada@example.com"),
            (field::PASSWORD, "password1"),
            (field::CONFIRM_PASSWORD, "password1"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome, RemoteOutcome::server_error("user already exists"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /register "));
    assert!(!body_of(&request).contains("confirm_password"));
}

#[tokio::test]
async fn plain_text_rejection_uses_raw_body() {
    let (base, _server) = serve_once("500 Internal Server Error", &[], "database is down").await;
    let action = LoginAction::new(client_for(&base, Arc::new(CookieSession::new())));

    let outcome = action.perform(&fields(&[])).await.unwrap();

    assert_eq!(outcome, RemoteOutcome::server_error("database is down"));
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    let base = dead_base_url().await;
    let action = LoginAction::new(client_for(&base, Arc::new(CookieSession::new())));

    let outcome = action.perform(&fields(&[])).await.unwrap();

    assert_eq!(outcome, RemoteOutcome::TransportError);
}

#[tokio::test]
async fn undecodable_success_body_is_an_error() {
    let (base, _server) = serve_once("200 OK", &[], "<html>ok</html>").await;
    let action = LoginAction::new(client_for(&base, Arc::new(CookieSession::new())));

    let err = action.perform(&fields(&[])).await.unwrap_err();

    assert!(matches!(err, RemoteError::Decode { .. }));
}

// ============================================================================
// Shortener service
// ============================================================================

#[tokio::test]
async fn anonymous_shorten_omits_expiration() {
    let (base, server) = serve_once("200 OK", &[], r#"{"message":"http://localhost:8081/aZ3x9"}"#).await;
    let session = Arc::new(CookieSession::new());
    let action = ShortenAction::new(client_for(&base, session.clone()), session);

    let outcome = action
        .perform(&fields(&[
            (field::URL, "https://example.com"),
            (field::EXPIRATION, "90"),
        ]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RemoteOutcome::Success("http://localhost:8081/aZ3x9".to_string())
    );

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /create_short_url "));
    let body: serde_json::Value = serde_json::from_str(body_of(&request)).unwrap();
    assert_eq!(body["url"], "https://example.com");
    assert!(body.get("expiration").is_none());
}

#[tokio::test]
async fn logged_in_shorten_sends_expiration_and_cookies() {
    let (base, server) = serve_once("200 OK", &[], r#"{"message":"http://s/abc"}"#).await;
    let session = Arc::new(CookieSession::new());
    session.insert(AUTH_COOKIE, "pass");
    let action = ShortenAction::new(client_for(&base, session.clone()), session);

    action
        .perform(&fields(&[
            (field::URL, "https://example.com"),
            (field::EXPIRATION, "365"),
        ]))
        .await
        .unwrap();

    let request = server.await.unwrap();
    let body: serde_json::Value = serde_json::from_str(body_of(&request)).unwrap();
    assert_eq!(body["expiration"], 365);
    assert!(request.to_ascii_lowercase().contains("cookie: auth=pass"));
}

#[test]
fn expiration_only_for_authenticated_users() {
    let values = fields(&[(field::EXPIRATION, " 90 ")]);
    assert_eq!(requested_expiration(&values, true), Some(90));
    assert_eq!(requested_expiration(&values, false), None);
    assert_eq!(requested_expiration(&fields(&[]), true), None);
}

// ============================================================================
// History service
// ============================================================================

#[tokio::test]
async fn history_decodes_entries() {
    let (base, server) = serve_once(
        "200 OK",
        &[],
        r#"[{"short_url":"http://s/a","long_url":"https://example.com/a","expiration_date":"2026-12-01"},
            {"short_url":"http://s/b","long_url":"https://example.com/b","expiration_date":"2027-01-01"}]"#,
    )
    .await;
    let action = HistoryAction::new(client_for(&base, Arc::new(CookieSession::new())));

    let history = match action.perform(&fields(&[])).await.unwrap() {
        RemoteOutcome::Success(history) => history,
        other => panic!("expected history, got {:?}", other),
    };

    assert_eq!(history.len(), 2);
    assert_eq!(
        history.0[0],
        HistoryEntry {
            short_url: "http://s/a".into(),
            long_url: "https://example.com/a".into(),
            expiration_date: "2026-12-01".into(),
        }
    );
    assert!(server.await.unwrap().starts_with("GET /history "));
}

#[tokio::test]
async fn history_unauthorized_is_server_error() {
    let (base, _server) = serve_once("401 Unauthorized", &[], r#"{"message":"unauthorized"}"#).await;
    let action = HistoryAction::new(client_for(&base, Arc::new(CookieSession::new())));

    let outcome = action.perform(&fields(&[])).await.unwrap();

    assert_eq!(outcome, RemoteOutcome::server_error("unauthorized"));
}

// ============================================================================
// Through the controller
// ============================================================================

#[tokio::test]
async fn login_form_end_to_end() {
    let (base, _server) = serve_once(
        "200 OK",
        &["Set-Cookie: auth=pass"],
        r#"{"message":"success"}"#,
    )
    .await;
    let session = Arc::new(CookieSession::new());
    let form = SubmissionController::new(
        "login",
        login_rules(),
        LoginAction::new(client_for(&base, session.clone())),
    );
    form.set_field(field::EMAIL, "a@b.co");
    form.set_field(field::PASSWORD, "password1");

    form.submit().await;

    assert_eq!(form.phase(), Phase::Succeeded);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn controller_maps_decode_failure_to_transport() {
    let (base, _server) = serve_once("200 OK", &[], "not json").await;
    let form = SubmissionController::new(
        "login",
        login_rules(),
        LoginAction::new(client_for(&base, Arc::new(CookieSession::new()))),
    );
    form.set_field(field::EMAIL, "a@b.co");
    form.set_field(field::PASSWORD, "password1");

    form.submit().await;

    assert_eq!(form.snapshot().error, Some(SubmissionError::Transport));
}

// ============================================================================
// Endpoint resolution
// ============================================================================

#[test]
fn endpoints_resolve_against_each_service() {
    let endpoints = Endpoints::from_bases(
        "http://localhost:8080",
        "http://localhost:8081/",
        "http://localhost:8082",
    )
    .unwrap();
    assert_eq!(endpoints.login.as_str(), "http://localhost:8080/login");
    assert_eq!(
        endpoints.shorten.as_str(),
        "http://localhost:8081/create_short_url"
    );
    assert_eq!(endpoints.history.as_str(), "http://localhost:8082/history");
}

#[test]
fn json_message_wins_over_raw_body() {
    let message = rejection_message(
        reqwest::StatusCode::BAD_REQUEST,
        br#"{"message":"invalid url"}"#,
    );
    assert_eq!(message, "invalid url");
}
