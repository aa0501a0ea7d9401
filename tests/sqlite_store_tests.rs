mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use common::*;
use passkey_rp_server::db::SqliteCredentialStore;
use webauthn_rs::prelude::Passkey;

async fn sqlite_state() -> passkey_rp_server::state::AppState {
    // One connection, so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteCredentialStore::from_pool(pool).await.unwrap();

    let mut state = test_state();
    state.credentials = Arc::new(store);
    state
}

#[tokio::test]
async fn ceremonies_run_against_sqlite_credentials() {
    let state = sqlite_state().await;
    let app = app(state.clone());
    let mut authenticator = register(&app, "alice").await;

    let (_, options) = post_json(&app, "/login/start", json!({ "username": "alice" })).await;
    let assertion = authenticator.login(&options, "alice");
    let (status, body) = post_json(&app, "/login/finish", finish_body("alice", &assertion)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let stored = state.credentials.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(stored.credential_id, authenticator.credential_id);
    let passkey: Passkey = serde_json::from_slice(&stored.public_key).unwrap();
    assert_eq!(passkey.cred_id().to_vec(), authenticator.credential_id);
    assert_eq!(stored.sign_count, 1);
    assert_eq!(stored.transports, vec!["internal", "hybrid"]);

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["credential_store"], "sqlite");
    assert_eq!(health["credentials"], 1);
}

#[tokio::test]
async fn re_registration_replaces_the_stored_credential() {
    let state = sqlite_state().await;
    let app = app(state.clone());

    let first = register(&app, "bob").await;
    let second = register(&app, "bob").await;
    assert_ne!(first.credential_id, second.credential_id);

    let stored = state.credentials.get_credential("bob").await.unwrap().unwrap();
    assert_eq!(stored.credential_id, second.credential_id);
    assert_eq!(state.credentials.credential_count().await.unwrap(), 1);
}

#[tokio::test]
async fn login_counter_survives_a_second_login() {
    let state = sqlite_state().await;
    let app = app(state.clone());
    let mut authenticator = register(&app, "carl").await;

    for _ in 0..2 {
        let (_, options) = post_json(&app, "/login/start", json!({ "username": "carl" })).await;
        let assertion = authenticator.login(&options, "carl");
        let (_, body) = post_json(&app, "/login/finish", finish_body("carl", &assertion)).await;
        assert_eq!(body["verified"], true);
    }

    let stored = state.credentials.get_credential("carl").await.unwrap().unwrap();
    assert_eq!(stored.sign_count, 2);
}
