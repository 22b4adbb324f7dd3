//! End-to-end flow over the real router: register, verify, login, profile.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use printerd::{
    app::build_app,
    config::{AppConfig, JwtConfig},
    state::AppState,
    store::UserStore,
};

async fn test_app(dir: &TempDir) -> Router {
    let config = Arc::new(AppConfig {
        data_file: dir.path().join("users.json"),
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            issuer: "printerd".into(),
            audience: "printerd-users".into(),
            ttl_minutes: 5,
        },
    });
    let store = Arc::new(UserStore::open(config.data_file.clone()).await);
    build_app(AppState::from_parts(store, config))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // Error responses are plain text; fold them into a JSON string.
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

#[tokio::test]
async fn register_verify_login_profile_flow() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    // Register with mixed-case email.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "Alice@Example.com",
            "password": "secret123",
            "firstName": "Alice",
            "lastName": "Printer",
            "company": "The Printer"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["isVerified"], json!(false));
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    // A case-variant of the same email is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "alice@example.com",
            "password": "different-pass",
            "firstName": "Alice",
            "lastName": "Again"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Login is refused until the address is verified.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!("Please verify your email before logging in"));

    // Verify via the emailed token (the user id).
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/auth/verify?token={user_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isVerified"], json!(true));

    // Wrong password and unknown account are indistinguishable.
    let (status, wrong_pw) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "not-the-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw, unknown);

    // Successful login returns a token and the public user.
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isVerified"], json!(true));
    let token = body["token"].as_str().unwrap().to_string();

    // Profile requires the token.
    let (status, _) = send(&app, "GET", "/api/user/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, profile) = send(&app, "GET", "/api/user/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], json!("Alice@Example.com"));
    assert_eq!(profile["company"], json!("The Printer"));
    assert!(profile["lastLogin"].is_string());
    assert!(profile.get("hashedPassword").is_none());
    let created_at = profile["createdAt"].clone();

    // Update a couple of profile fields.
    let (status, updated) = send(
        &app,
        "PUT",
        "/api/user/profile",
        Some(&token),
        Some(json!({"company": "Printer Labs", "phone": "+1-555-0100"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["company"], json!("Printer Labs"));
    assert_eq!(updated["phone"], json!("+1-555-0100"));
    assert_eq!(updated["firstName"], json!("Alice"));
    assert_eq!(updated["id"], json!(user_id));
    assert_eq!(updated["createdAt"], created_at);

    // An update without any updatable field is rejected.
    let (status, _) = send(
        &app,
        "PUT",
        "/api/user/profile",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_malformed_input() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "not-an-email",
            "password": "secret123",
            "firstName": "A",
            "lastName": "B"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "short@example.com",
            "password": "short",
            "firstName": "A",
            "lastName": "B"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_rejects_unknown_token() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, _) = send(
        &app,
        "GET",
        "/api/auth/verify?token=00000000-0000-0000-0000-000000000000",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_route_responds() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}
