use std::sync::Arc;

use serde_json::json;
use shared::error::ErrorCode;
use url::Url;

use crate::{
    api::{Method, DASHBOARD_ENDPOINT, VERIFY_TOKEN_ENDPOINT},
    session::{strip_token, token_from_url, AuthSource, SessionGate, SessionState},
    support::*,
    token_store::{MemoryTokenStore, TokenStore},
};

fn entry(url: &str) -> Url {
    Url::parse(url).expect("valid url")
}

fn valid_user() -> serde_json::Value {
    json!({ "valid": true, "user": { "id": 1, "username": "amina", "is_paid": true } })
}

#[test]
fn token_is_read_from_query_and_stripped() {
    let url = entry("https://app.example/dashboard/?token=abc&ref=bot");

    assert_eq!(token_from_url(&url).as_deref(), Some("abc"));
    assert_eq!(
        strip_token(&url).as_str(),
        "https://app.example/dashboard/?ref=bot"
    );

    let only_token = entry("https://app.example/dashboard/?token=abc");
    assert_eq!(strip_token(&only_token).as_str(), "https://app.example/dashboard/");
    assert_eq!(token_from_url(&entry("https://app.example/?token=")), None);
}

#[tokio::test]
async fn url_token_is_verified_and_persisted() {
    let api = ScriptedApi::new();
    api.respond(VERIFY_TOKEN_ENDPOINT, valid_user());
    let tokens = Arc::new(MemoryTokenStore::default());
    let mut gate = SessionGate::new(backend(&api), tokens.clone());

    let url = entry("https://app.example/courses/?token=from-bot");
    let state = gate.initialize(Some(&url)).await.clone();

    assert!(matches!(
        state,
        SessionState::Authenticated {
            source: AuthSource::UrlToken,
            ..
        }
    ));
    assert_eq!(tokens.load().unwrap().as_deref(), Some("from-bot"));
    assert_eq!(
        gate.cleaned_url().map(Url::as_str),
        Some("https://app.example/courses/")
    );
    assert!(gate.is_authenticated());

    let calls = api.calls_to(VERIFY_TOKEN_ENDPOINT);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].body, Some(json!({ "token": "from-bot" })));
}

#[tokio::test]
async fn stored_token_is_used_when_url_has_none() {
    let api = ScriptedApi::new();
    api.respond(VERIFY_TOKEN_ENDPOINT, valid_user());
    let tokens = Arc::new(MemoryTokenStore::with_token("saved"));
    let mut gate = SessionGate::new(backend(&api), tokens);

    let state = gate.initialize(Some(&entry("https://app.example/profile/"))).await;

    assert!(matches!(
        state,
        SessionState::Authenticated {
            source: AuthSource::StoredToken,
            ..
        }
    ));
    assert!(api.calls_to(DASHBOARD_ENDPOINT).is_empty());
}

#[tokio::test]
async fn invalid_stored_token_is_cleared_before_cookie_probe() {
    let api = ScriptedApi::new();
    api.respond(VERIFY_TOKEN_ENDPOINT, json!({ "valid": false }));
    api.respond(
        DASHBOARD_ENDPOINT,
        json!({ "user": { "username": "cookie-user", "is_paid": false }, "stats": {}, "blocks": [] }),
    );
    let tokens = Arc::new(MemoryTokenStore::with_token("old"));
    let mut gate = SessionGate::new(backend(&api), tokens.clone());

    let state = gate.initialize(None).await.clone();

    assert_eq!(tokens.load().unwrap(), None);
    match state {
        SessionState::Authenticated { user, source } => {
            assert_eq!(source, AuthSource::CookieSession);
            assert_eq!(user.username, "cookie-user");
        }
        SessionState::Anonymous => panic!("cookie session expected"),
    }
    assert!(!gate.is_authenticated());
}

#[tokio::test]
async fn every_source_failing_ends_anonymous() {
    let api = ScriptedApi::new();
    api.fail(
        VERIFY_TOKEN_ENDPOINT,
        api_error(ErrorCode::Transport, "connection refused"),
    );
    api.fail(
        DASHBOARD_ENDPOINT,
        api_error(ErrorCode::Unauthorized, "Не авторизован"),
    );
    let mut gate = SessionGate::new(backend(&api), Arc::new(MemoryTokenStore::default()));

    let url = entry("https://app.example/?token=bad");
    let state = gate.initialize(Some(&url)).await;

    assert_eq!(state, &SessionState::Anonymous);
    assert!(gate.user().is_none());
}

#[tokio::test]
async fn initialize_runs_once() {
    let api = ScriptedApi::new();
    api.respond(VERIFY_TOKEN_ENDPOINT, valid_user());
    let mut gate = SessionGate::new(backend(&api), Arc::new(MemoryTokenStore::with_token("t")));

    gate.initialize(None).await;
    gate.initialize(None).await;

    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn logout_clears_token_and_session() {
    let api = ScriptedApi::new();
    api.respond(VERIFY_TOKEN_ENDPOINT, valid_user());
    let tokens = Arc::new(MemoryTokenStore::with_token("t"));
    let mut gate = SessionGate::new(backend(&api), tokens.clone());
    gate.initialize(None).await;

    gate.logout().expect("logout");

    assert_eq!(tokens.load().unwrap(), None);
    assert_eq!(gate.state(), Some(&SessionState::Anonymous));
}
