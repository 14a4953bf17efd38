//! End-to-end tests for the HTTP API: the real router, middleware, and
//! SQLite adapter, with only the completion provider stubbed out.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use api_lib::adapters::DbAdapter;
use api_lib::config::Config;
use api_lib::extract::MAX_UPLOAD_BYTES;
use api_lib::token::Claims;
use api_lib::web::{self, state::AppState};
use support_chat_core::ports::{CompletionService, PortError, PortResult};
use support_chat_core::service::{ChatService, FALLBACK_REPLY};

const JWT_SECRET: &str = "integration-test-secret";
const STUB_REPLY: &str = "Hello from the stub provider.";

struct StubCompletion {
    fail: bool,
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> PortResult<String> {
        if self.fail {
            Err(PortError::Unexpected("provider unreachable".to_string()))
        } else {
            Ok(STUB_REPLY.to_string())
        }
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        log_level: tracing::Level::INFO,
        jwt_secret: JWT_SECRET.to_string(),
        openai_api_key: None,
        openai_api_base: None,
        chat_model: "gpt-3.5-turbo".to_string(),
        provider_timeout_secs: 5,
        frontend_origin: "http://localhost:5173".to_string(),
        production: false,
    }
}

async fn app(fail_provider: bool) -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = Arc::new(DbAdapter::new(pool));
    db.run_migrations().await.unwrap();

    let chat = ChatService::new(db.clone(), Arc::new(StubCompletion { fail: fail_provider }));
    let state = Arc::new(AppState {
        store: db,
        chat,
        config: Arc::new(test_config()),
    });
    web::router(state)
}

async fn post_json(
    app: &Router,
    uri: &str,
    body: Value,
    cookie: Option<&str>,
) -> Response<axum::body::Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<axum::body::Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response<axum::body::Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers and logs `username` in, returning the session cookie pair.
async fn login(app: &Router, username: &str) -> String {
    let response = post_json(
        app,
        "/api/auth/register",
        json!({ "username": username, "password": "hunter2!" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        app,
        "/api/auth/login",
        json!({ "username": username, "password": "hunter2!" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set the session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

//=========================================================================================
// Multipart helpers
//=========================================================================================

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

fn multipart_message(message: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"message\"\r\n\r\n{message}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_file(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_empty() -> Vec<u8> {
    format!("--{BOUNDARY}--\r\n").into_bytes()
}

async fn post_multipart(
    app: &Router,
    uri: &str,
    body: Vec<u8>,
    cookie: Option<&str>,
) -> Response<axum::body::Body> {
    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body)).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

//=========================================================================================
// Auth
//=========================================================================================

#[tokio::test]
async fn register_login_current_user_flow() {
    let app = app(false).await;
    let cookie = login(&app, "alice").await;

    let response = get(&app, "/api/auth/user", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app(false).await;
    let payload = json!({ "username": "alice", "password": "hunter2!" });

    let response = post_json(&app, "/api/auth/register", payload.clone(), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(&app, "/api/auth/register", payload, None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn mismatched_confirmation_is_rejected() {
    let app = app(false).await;
    let response = post_json(
        &app,
        "/api/auth/register",
        json!({ "username": "alice", "password": "one", "confirm_password": "two" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized_and_sets_no_cookie() {
    let app = app(false).await;
    let _ = login(&app, "alice").await;

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "username": "alice", "password": "wrong" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    // Unknown user renders the same generic error.
    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "username": "nobody", "password": "wrong" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn missing_token_and_bad_token_are_distinct() {
    let app = app(false).await;

    // Never logged in: 401.
    let response = get(&app, "/api/auth/user", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Tampered token: 403.
    let cookie = login(&app, "alice").await;
    let tampered = format!("{}x", cookie);
    let response = get(&app, "/api/auth/user", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Expired token: 403.
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "alice".to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let expired = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    let response = get(&app, "/api/auth/user", Some(&format!("token={expired}"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_clears_the_cookie_without_a_session() {
    let app = app(false).await;

    let response = post_json(&app, "/api/auth/logout", json!({}), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

//=========================================================================================
// Chat
//=========================================================================================

#[tokio::test]
async fn send_message_and_read_history() {
    let app = app(false).await;
    let cookie = login(&app, "alice").await;

    let response =
        post_multipart(&app, "/api/chat", multipart_message("hi there"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], STUB_REPLY);

    let response = get(&app, "/api/chat", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hi there");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], STUB_REPLY);
}

#[tokio::test]
async fn provider_outage_degrades_to_a_fallback_reply() {
    let app = app(true).await;
    let cookie = login(&app, "alice").await;

    let response = post_multipart(&app, "/api/chat", multipart_message("hi"), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], FALLBACK_REPLY);

    // The transcript holds the user turn plus exactly one fallback turn.
    let response = get(&app, "/api/chat", Some(&cookie)).await;
    let body = json_body(response).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], FALLBACK_REPLY);
}

#[tokio::test]
async fn empty_send_is_rejected_and_writes_nothing() {
    let app = app(false).await;
    let cookie = login(&app, "alice").await;

    let response = post_multipart(&app, "/api/chat", multipart_empty(), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_multipart(&app, "/api/chat", multipart_message("   "), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/chat", Some(&cookie)).await;
    let body = json_body(response).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn txt_upload_is_confirmed_and_recorded() {
    let app = app(false).await;
    let cookie = login(&app, "alice").await;

    let body = multipart_file("faq.txt", "text/plain", b"Q: hours?\nA: 9-5.");
    let response = post_multipart(&app, "/api/chat", body, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let confirmation = body["message"].as_str().unwrap().to_string();
    assert!(confirmation.contains("faq.txt"));

    let response = get(&app, "/api/chat", Some(&cookie)).await;
    let body = json_body(response).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "faq.txt");
    assert_eq!(messages[1]["role"], "system");
    assert_eq!(messages[1]["content"], confirmation.as_str());
}

#[tokio::test]
async fn unsupported_upload_type_is_rejected() {
    let app = app(false).await;
    let cookie = login(&app, "alice").await;

    let body = multipart_file("tool.exe", "application/x-msdownload", b"MZ");
    let response = post_multipart(&app, "/api/chat", body, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn oversized_upload_is_rejected_with_413() {
    let app = app(false).await;
    let cookie = login(&app, "alice").await;

    let data = vec![b'a'; MAX_UPLOAD_BYTES + 1];
    let body = multipart_file("big.txt", "text/plain", &data);
    let response = post_multipart(&app, "/api/chat", body, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Nothing was stored: a later send sees no document context, and the
    // transcript stays empty.
    let response = get(&app, "/api/chat", Some(&cookie)).await;
    let body = json_body(response).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn chat_requires_a_session() {
    let app = app(false).await;
    let response = get(&app, "/api/chat", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
