//! Integration tests for server wiring

use std::net::TcpListener;
use std::sync::Arc;

use secure_api::configuration::JwtSettings;
use secure_api::startup::run;
use secure_api::state::AppState;
use secure_api::store::{InMemoryCredentialStore, InMemoryRefreshTokenLedger};

fn jwt_settings(secret: &str) -> JwtSettings {
    JwtSettings {
        secret: secret.to_string(),
        access_token_expiry: 3600,
        issuer: None,
        audience: None,
    }
}

fn state(secret: &str) -> Result<AppState, secure_api::error::ConfigError> {
    AppState::new(
        Arc::new(InMemoryCredentialStore::with_hash_cost(4)),
        Arc::new(InMemoryRefreshTokenLedger::new()),
        jwt_settings(secret),
    )
}

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let state = state("integration-test-secret-with-more-than-forty-chars")
        .expect("Failed to build application state");
    let server = run(listener, state).expect("Failed to create server");

    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.headers().contains_key("x-request-id"));
}

#[test]
fn short_signing_secret_prevents_startup() {
    let result = state("only-thirty-nine-characters-long-secret");
    assert!(result.is_err(), "a 39 character secret must be refused");
}
