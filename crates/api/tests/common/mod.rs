//! Common test utilities for integration tests.
//!
//! The app runs on the local backend over an in-memory key-value store, so
//! these tests need no database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use persistence::MemoryKeyValueStore;
use serde_json::{json, Value};
use shared::session::SessionSigner;
use sri_invite_api::config::{
    Config, DatabaseConfig, InviteCodesConfig, LoggingConfig, SecurityConfig, ServerConfig,
    SessionConfig, StorageConfig,
};
use sri_invite_api::{app::create_app, services::BackendSelector};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-session-secret";
pub const ADMIN_USERNAME: &str = "root_admin";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// Local-backend configuration with a test session secret.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
            max_body_size: 1_048_576,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
        storage: StorageConfig {
            data_dir: "unused".to_string(),
        },
        session: SessionConfig {
            secret: TEST_SECRET.to_string(),
            ttl_hours: 24,
        },
        invite_codes: InviteCodesConfig {
            default_length: 12,
            max_batch_size: 10,
        },
        security: SecurityConfig::default(),
    }
}

/// App on a fresh in-memory store.
pub fn create_test_app() -> Router {
    let config = test_config();
    let backends =
        BackendSelector::from_parts(Arc::new(MemoryKeyValueStore::new()), false, None);
    let sessions = SessionSigner::new(&config.session.secret, config.session.ttl_hours)
        .expect("valid test secret");
    create_app(config, backends, sessions, None)
}

/// App configured for a remote database that never connected.
pub fn create_unconnected_remote_app() -> Router {
    let mut config = test_config();
    config.database.url = "postgres://nobody@localhost:1/none".to_string();
    let backends = BackendSelector::from_parts(Arc::new(MemoryKeyValueStore::new()), true, None);
    let sessions = SessionSigner::new(&config.session.secret, config.session.ttl_hours)
        .expect("valid test secret");
    create_app(config, backends, sessions, None)
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn json_request_with_auth(
    method: Method,
    uri: &str,
    body: Value,
    token: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// GET carrying the client id cookie issued by the consume endpoint.
pub fn get_request_as_client(uri: &str, client_cookie: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::COOKIE, client_cookie)
        .body(Body::empty())
        .unwrap()
}

/// `name=value` pair of the first `Set-Cookie` header.
pub fn issued_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

/// Consumes `code` as a new client; returns the response and its client cookie.
pub async fn consume_as_new_client(
    app: &Router,
    code: &str,
    session_id: &str,
) -> (Value, Option<String>) {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/invite-codes/consume",
            json!({ "code": code, "sessionId": session_id }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .contains_key(header::SET_COOKIE)
        .then(|| issued_cookie(&response));
    (parse_response_body(response).await, cookie)
}

pub fn request_with_auth(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn parse_response_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap_or(Value::Null)
}

/// Creates the first admin and logs in; returns the bearer token.
pub async fn setup_admin(app: &Router) -> String {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/admin/setup",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    login(app, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/admin/login",
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    body["token"].as_str().unwrap().to_string()
}

/// Creates one invite code through the admin API and returns its JSON.
pub async fn create_code(app: &Router, token: &str, options: Value) -> Value {
    let response = send(
        app,
        json_request_with_auth(Method::POST, "/api/v1/admin/invite-codes", options, token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    parse_response_body(response).await
}
