//! # Unimedia CLI
//!
//! Account administration that has to work before any admin can log in.
//!
//! ```ignore
//! use unimedia_cli::{NewAdmin, create_admin};
//!
//! let user_id = create_admin(&pool, &NewAdmin { .. }).await?;
//! ```

use anyhow::{Context, bail};
use sqlx::PgPool;

use unimedia_cache::{RedisCache, invalidate};
use unimedia_core::{hash_password, roles};
use unimedia_models::{RoleId, UserId};

pub struct NewAdmin {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Creates an active, verified account holding the `admin` role.
pub async fn create_admin(db: &PgPool, admin: &NewAdmin) -> anyhow::Result<UserId> {
    if admin.password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }

    let password_hash = hash_password(&admin.password).map_err(|e| e.error)?;

    let mut tx = db.begin().await?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (email, username, first_name, last_name, password_hash, is_active, email_verified)
         VALUES (LOWER($1), $2, $3, $4, $5, TRUE, TRUE)
         ON CONFLICT DO NOTHING
         RETURNING id",
    )
    .bind(admin.email.trim())
    .bind(admin.username.trim())
    .bind(&admin.first_name)
    .bind(&admin.last_name)
    .bind(&password_hash)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        bail!("A user with this email or username already exists");
    };

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         VALUES ($1, $2)
         ON CONFLICT (user_id, role_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(RoleId::from_uuid(roles::ADMIN_ID))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(user_id)
}

/// Grants the named role to the user with `email`. Returns `false` if the user
/// already held it.
///
/// Pass the API's permission cache so the new grants apply on the user's next
/// request.
pub async fn assign_role(
    db: &PgPool,
    cache: Option<&RedisCache>,
    email: &str,
    role_name: &str,
) -> anyhow::Result<bool> {
    let user_id = sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(db)
        .await?
        .with_context(|| format!("No user with email {email}"))?;

    let role_id = sqlx::query_scalar::<_, RoleId>("SELECT id FROM roles WHERE name = $1")
        .bind(role_name)
        .fetch_optional(db)
        .await?
        .with_context(|| format!("No role named {role_name}"))?;

    let result = sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         VALUES ($1, $2)
         ON CONFLICT (user_id, role_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(role_id)
    .execute(db)
    .await?;

    let assigned = result.rows_affected() > 0;
    if assigned {
        invalidate::user_permissions(cache, user_id.into_inner()).await;
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(email: &str, username: &str) -> NewAdmin {
        NewAdmin {
            email: email.to_string(),
            username: username.to_string(),
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            password: "password123".to_string(),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_create_admin_assigns_admin_role(pool: PgPool) {
        let user_id = create_admin(&pool, &admin("Root@Example.com", "root"))
            .await
            .unwrap();

        let roles: Vec<String> = sqlx::query_scalar(
            "SELECT r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id WHERE ur.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(roles, vec!["admin"]);

        let email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(email, "root@example.com");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_create_admin_rejects_duplicate(pool: PgPool) {
        create_admin(&pool, &admin("root@example.com", "root"))
            .await
            .unwrap();
        assert!(
            create_admin(&pool, &admin("ROOT@example.com", "other"))
                .await
                .is_err()
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_assign_role_is_idempotent(pool: PgPool) {
        create_admin(&pool, &admin("root@example.com", "root"))
            .await
            .unwrap();

        assert!(
            assign_role(&pool, None, "root@example.com", "moderator")
                .await
                .unwrap()
        );
        assert!(
            !assign_role(&pool, None, "root@example.com", "moderator")
                .await
                .unwrap()
        );
        assert!(
            assign_role(&pool, None, "root@example.com", "nope")
                .await
                .is_err()
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires PostgreSQL and Redis"]
    async fn test_assign_role_invalidates_permission_cache(pool: PgPool) {
        let config = unimedia_cache::CacheConfig::from_env();
        let cache = RedisCache::new(&config.redis_url, config.ttl()).await.unwrap();
        let user_id = create_admin(&pool, &admin("root@example.com", "root"))
            .await
            .unwrap();
        let key = unimedia_cache::keys::permissions::user_generation(user_id.into_inner());

        let before = cache.counters(&[key.clone()]).await.unwrap();
        assign_role(&pool, Some(&cache), "root@example.com", "moderator")
            .await
            .unwrap();
        let after = cache.counters(&[key.clone()]).await.unwrap();
        assert_eq!(after[0], before[0] + 1);

        // Already held: nothing changes, nothing to invalidate.
        assign_role(&pool, Some(&cache), "root@example.com", "moderator")
            .await
            .unwrap();
        assert_eq!(cache.counters(&[key]).await.unwrap(), after);
    }
}
