//! Requests that are answered before any database access.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{jwt_config, lazy_pool, send, test_app, token_for};
use unimedia_auth::create_access_token;
use unimedia_config::JwtConfig;

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_app(lazy_pool());

    let (status, body) = send(&app, Method::GET, "/api/auth/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = test_app(lazy_pool());

    let (status, body) = send(&app, Method::GET, "/api/users", Some("not.a.jwt"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = test_app(lazy_pool());
    let expired_config = JwtConfig {
        access_token_expiry: -3600,
        ..jwt_config()
    };
    let token = create_access_token(
        Uuid::new_v4(),
        "ada@example.com",
        "ada",
        vec!["admin".to_string()],
        &expired_config,
    )
    .unwrap();

    let (status, _) = send(&app, Method::GET, "/api/roles", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = test_app(lazy_pool());
    let foreign_config = JwtConfig {
        secret: "some-other-secret".to_string(),
        ..jwt_config()
    };
    let token = create_access_token(
        Uuid::new_v4(),
        "ada@example.com",
        "ada",
        vec!["admin".to_string()],
        &foreign_config,
    )
    .unwrap();

    let (status, _) = send(&app, Method::GET, "/api/roles", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gate_forbids_non_admin() {
    let app = test_app(lazy_pool());
    let token = token_for(Uuid::new_v4(), &["user", "moderator"]);

    let (status, body) = send(&app, Method::GET, "/api/roles", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied. Required role: admin");
}

#[tokio::test]
async fn test_role_gate_without_token_is_unauthorized() {
    let app = test_app(lazy_pool());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/roles",
        None,
        Some(json!({ "name": "editor" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gate_admits_admin_claim() {
    let app = test_app(lazy_pool());
    let token = token_for(Uuid::new_v4(), &["admin"]);

    // Past the gate, the malformed id is rejected by the path extractor.
    let (status, _) = send(&app, Method::GET, "/api/roles/not-a-uuid", Some(&token), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_validation_runs_before_lookup() {
    let app = test_app(lazy_pool());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "not-an-email", "password": "whatever" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid email address");
}

#[tokio::test]
async fn test_login_missing_field_is_bad_request() {
    let app = test_app(lazy_pool());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password is required");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = test_app(lazy_pool());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "ada@example.com",
            "username": "ada",
            "password": "short"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Password must be 8-128 characters");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app(lazy_pool());

    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Unimedia API");
    assert!(body["paths"]["/api/auth/login"].is_object());
    assert!(body["paths"]["/api/roles/{id}/permissions/{permission_id}"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app(lazy_pool());

    let (status, _) = send(&app, Method::GET, "/api/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
