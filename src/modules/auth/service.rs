use std::sync::LazyLock;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::{info, instrument, warn};

use unimedia_auth::tokens::{expires_in_seconds, verification_expires_at};
use unimedia_auth::{create_access_token, generate_opaque_token, hash_token};
use unimedia_cache::RedisCache;
use unimedia_config::{EmailConfig, JwtConfig};
use unimedia_core::{AppError, hash_password, roles, verify_password};
use unimedia_models::auth::TOKEN_TYPE;
use unimedia_models::{
    LoginRequest, LoginResponse, MeResponse, RefreshTokenId, RegisterRequest, TokenResponse, User,
    UserId, UserRecord,
};

use crate::email::EmailService;
use crate::modules::permissions::service::effective_permission_names;
use crate::modules::roles::service::get_user_role_names;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";

/// Verified against when the email is unknown, so a miss costs as much as a
/// wrong password.
static DUMMY_PASSWORD_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unimedia-timing-equalizer").ok());

#[derive(FromRow)]
struct RefreshTokenRow {
    id: RefreshTokenId,
    user_id: UserId,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized(INVALID_CREDENTIALS.to_string())
}

fn invalid_refresh_token() -> AppError {
    AppError::unauthorized(INVALID_REFRESH_TOKEN.to_string())
}

fn map_registration_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("idx_users_username_lower") => "Username is already taken",
                _ => "Email is already registered",
            };
            return AppError::conflict(anyhow!(message));
        }
    }
    AppError::from(e)
}

async fn issue_refresh_token<'e>(
    db: impl PgExecutor<'e>,
    user_id: UserId,
    jwt_config: &JwtConfig,
) -> Result<(String, RefreshTokenId), AppError> {
    let token = generate_opaque_token();

    let id = sqlx::query_scalar::<_, RefreshTokenId>(
        "INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(expires_in_seconds(jwt_config.refresh_token_expiry))
    .fetch_one(db)
    .await?;

    Ok((token, id))
}

/// Revokes every outstanding refresh token of the user and returns how many
/// were still live.
pub async fn revoke_all_refresh_tokens<'e>(
    db: impl PgExecutor<'e>,
    user_id: UserId,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = NOW()
         WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

pub struct AuthService;

impl AuthService {
    /// Creates an unverified account holding the default role and mails the
    /// verification link.
    #[instrument(skip(db, email_config, dto), fields(email = %dto.email))]
    pub async fn register(
        db: &PgPool,
        email_config: &EmailConfig,
        dto: RegisterRequest,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(&dto.password)?;
        let verification_token = generate_opaque_token();

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, username, first_name, last_name, password_hash,
                 email_verification_token, email_verification_expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            User::COLUMNS
        ))
        .bind(normalize_email(&dto.email))
        .bind(dto.username.trim())
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(&password_hash)
        .bind(hash_token(&verification_token))
        .bind(verification_expires_at())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_registration_conflict)?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(user.id)
        .bind(roles::DEFAULT_ROLE)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = %user.id, "User registered");

        let email_service = EmailService::new(email_config.clone());
        let (to, username) = (user.email.clone(), user.username.clone());
        tokio::spawn(async move {
            if let Err(e) = email_service
                .send_verification_email(&to, &username, &verification_token)
                .await
            {
                warn!(error = %e, "Failed to send verification email");
            }
        });

        Ok(user)
    }

    #[instrument(skip(db, jwt_config, dto), fields(email = %dto.email))]
    pub async fn login(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {}, password_hash FROM users WHERE LOWER(email) = $1",
            User::COLUMNS
        ))
        .bind(normalize_email(&dto.email))
        .fetch_optional(db)
        .await?;

        let Some(record) = record else {
            if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
                let _ = verify_password(&dto.password, hash);
            }
            return Err(invalid_credentials());
        };

        if !verify_password(&dto.password, &record.password_hash)? || !record.user.is_active {
            return Err(invalid_credentials());
        }

        let user_id = record.user.id;
        let roles = get_user_role_names(db, user_id).await?;

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING {}",
            User::COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let (refresh_token, _) = issue_refresh_token(&mut *tx, user_id, jwt_config).await?;
        tx.commit().await?;

        let access_token = create_access_token(
            user_id.into_inner(),
            &user.email,
            &user.username,
            roles.clone(),
            jwt_config,
        )?;

        info!(user_id = %user_id, "User logged in");

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
            roles,
        })
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// The presented token is revoked and replaced in the same transaction.
    /// Presenting a token that was already revoked signs the user out
    /// everywhere.
    #[instrument(skip_all)]
    pub async fn refresh(
        db: &PgPool,
        jwt_config: &JwtConfig,
        refresh_token: &str,
    ) -> Result<TokenResponse, AppError> {
        let mut tx = db.begin().await?;

        let stored = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT id, user_id, expires_at, revoked_at
             FROM refresh_tokens WHERE token_hash = $1
             FOR UPDATE",
        )
        .bind(hash_token(refresh_token))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(invalid_refresh_token)?;

        if stored.revoked_at.is_some() {
            let revoked = revoke_all_refresh_tokens(&mut *tx, stored.user_id).await?;
            tx.commit().await?;
            warn!(
                user_id = %stored.user_id,
                revoked,
                "Revoked refresh token presented, all sessions revoked"
            );
            return Err(invalid_refresh_token());
        }

        if stored.expires_at <= Utc::now() {
            return Err(invalid_refresh_token());
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            User::COLUMNS
        ))
        .bind(stored.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid_refresh_token)?;

        let roles = get_user_role_names(&mut *tx, user.id).await?;
        let (new_token, new_id) = issue_refresh_token(&mut *tx, user.id, jwt_config).await?;

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW(), replaced_by = $1 WHERE id = $2")
            .bind(new_id)
            .bind(stored.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let access_token = create_access_token(
            user.id.into_inner(),
            &user.email,
            &user.username,
            roles,
            jwt_config,
        )?;

        Ok(TokenResponse {
            access_token,
            refresh_token: new_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: jwt_config.access_token_expiry,
        })
    }

    /// Revokes one refresh token. Unknown or already revoked tokens are
    /// accepted silently.
    #[instrument(skip_all)]
    pub async fn logout(db: &PgPool, refresh_token: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW()
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(refresh_token))
        .execute(db)
        .await?;

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn logout_all(db: &PgPool, user_id: UserId) -> Result<u64, AppError> {
        let revoked = revoke_all_refresh_tokens(db, user_id).await?;
        info!(user_id = %user_id, revoked, "All sessions revoked");
        Ok(revoked)
    }

    #[instrument(skip_all)]
    pub async fn verify_email(db: &PgPool, token: &str) -> Result<(), AppError> {
        let verified = sqlx::query_scalar::<_, UserId>(
            "UPDATE users SET
                 email_verified = TRUE,
                 email_verification_token = NULL,
                 email_verification_expires_at = NULL,
                 updated_at = NOW()
             WHERE email_verification_token = $1 AND email_verification_expires_at > NOW()
             RETURNING id",
        )
        .bind(hash_token(token.trim()))
        .fetch_optional(db)
        .await?;

        match verified {
            Some(user_id) => {
                info!(user_id = %user_id, "Email verified");
                Ok(())
            }
            None => Err(AppError::bad_request(anyhow!(
                "Invalid or expired verification token"
            ))),
        }
    }

    #[instrument(skip(db, cache))]
    pub async fn me(
        db: &PgPool,
        cache: Option<&RedisCache>,
        user_id: UserId,
    ) -> Result<MeResponse, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            User::COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        let roles = get_user_role_names(db, user_id).await?;
        let permissions = effective_permission_names(db, cache, user_id).await?;

        Ok(MeResponse {
            user,
            roles,
            permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_dummy_hash_is_available() {
        let hash = DUMMY_PASSWORD_HASH.as_deref().unwrap();
        assert!(!verify_password("anything", hash).unwrap());
    }

    #[test]
    fn test_credential_errors_are_generic() {
        let err = invalid_credentials();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.error.to_string(), INVALID_CREDENTIALS);
    }
}
