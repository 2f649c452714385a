mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;

use common::{TEST_PASSWORD, create_user, login, send, test_app, unique};
use unimedia_auth::hash_token;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_register_assigns_default_role(pool: PgPool) {
    let app = test_app(pool.clone());
    let username = unique("reg_");
    let email = format!("{username}@Example.com");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "username": username,
            "password": TEST_PASSWORD,
            "first_name": "Ada"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], email.to_lowercase());
    assert_eq!(body["email_verified"], false);
    assert!(body.get("password_hash").is_none());

    let login_body = login(&app, &email, TEST_PASSWORD).await;
    assert_eq!(login_body["roles"], json!(["user"]));
    assert_eq!(login_body["token_type"], "Bearer");
    assert_eq!(login_body["expires_in"], 900);

    let token = login_body["access_token"].as_str().unwrap();
    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["roles"], json!(["user"]));
    assert_eq!(
        me["permissions"],
        json!(["media:read", "requests:read", "requests:write"])
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_register_duplicate_email_conflicts(pool: PgPool) {
    let app = test_app(pool.clone());
    let existing = create_user(&pool, Some("user")).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": existing.email.to_uppercase(),
            "username": unique("other_"),
            "password": TEST_PASSWORD
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email is already registered");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": format!("{}@example.com", unique("fresh_")),
            "username": existing.username,
            "password": TEST_PASSWORD
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username is already taken");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_login_failures_share_one_message(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    let inactive = create_user(&pool, Some("user")).await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(inactive.id)
        .execute(&pool)
        .await
        .unwrap();

    let attempts = [
        (user.email.as_str(), "wrong-password"),
        ("nobody@example.com", TEST_PASSWORD),
        (inactive.email.as_str(), TEST_PASSWORD),
    ];

    for (email, password) in attempts {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
        assert_eq!(body["error"], "Invalid email or password");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_login_records_last_login(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;

    let body = login(&app, &user.email, TEST_PASSWORD).await;

    assert!(body["user"]["last_login_at"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_refresh_rotates_token(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("moderator")).await;
    let first = login(&app, &user.email, TEST_PASSWORD).await["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let second = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(body["access_token"].is_string());

    let replaced_by: Option<uuid::Uuid> =
        sqlx::query_scalar("SELECT replaced_by FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(&first))
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(replaced_by.is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_refresh_reuse_revokes_all_sessions(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    let first = login(&app, &user.email, TEST_PASSWORD).await["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;
    let second = body["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": first })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": second })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_refresh_rejects_expired_and_unknown(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    let token = login(&app, &user.email, TEST_PASSWORD).await["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    sqlx::query("UPDATE refresh_tokens SET expires_at = NOW() - INTERVAL '1 minute' WHERE user_id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();

    for candidate in [token.as_str(), "never-issued"] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": candidate })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired refresh token");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_logout_is_idempotent(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    let token = login(&app, &user.email, TEST_PASSWORD).await["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/logout",
            None,
            Some(json!({ "refresh_token": token })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_logout_all_revokes_every_session(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    let first = login(&app, &user.email, TEST_PASSWORD).await;
    let second = login(&app, &user.email, TEST_PASSWORD).await;

    let access = first["access_token"].as_str().unwrap();
    let (status, body) = send(&app, Method::POST, "/api/auth/logout-all", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out of 2 session(s)");

    for session in [&first, &second] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": session["refresh_token"] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_verify_email_consumes_token(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    sqlx::query(
        "UPDATE users SET email_verified = FALSE, email_verification_token = $1,
             email_verification_expires_at = NOW() + INTERVAL '1 hour'
         WHERE id = $2",
    )
    .bind(hash_token("known-token"))
    .bind(user.id)
    .execute(&pool)
    .await
    .unwrap();

    let request = json!({ "token": "known-token" });

    let (status, _) = send(&app, Method::POST, "/api/auth/verify-email", None, Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let verified: bool = sqlx::query_scalar("SELECT email_verified FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(verified);

    let (status, body) = send(&app, Method::POST, "/api/auth/verify-email", None, Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired verification token");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_change_password_signs_out_everywhere(pool: PgPool) {
    let app = test_app(pool.clone());
    let user = create_user(&pool, Some("user")).await;
    let session = login(&app, &user.email, TEST_PASSWORD).await;
    let access = session["access_token"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/profile/change-password",
        Some(access),
        Some(json!({ "current_password": "not-it", "new_password": "brand-new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/profile/change-password",
        Some(access),
        Some(json!({ "current_password": TEST_PASSWORD, "new_password": "brand-new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": session["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    login(&app, &user.email, "brand-new-pass").await;
}
