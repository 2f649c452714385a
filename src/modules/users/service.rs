use std::collections::HashMap;

use anyhow::anyhow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use unimedia_core::{AppError, PaginationMeta, hash_password, search::contains_pattern, verify_password};
use unimedia_models::{
    ChangePasswordDto, PaginatedUsersResponse, RoleSummary, UpdateProfileDto, User,
    UserFilterParams, UserId, UserWithRoles, ids::to_uuids,
};

use crate::modules::auth::service::revoke_all_refresh_tokens;

#[derive(FromRow)]
struct UserRoleRow {
    user_id: UserId,
    #[sqlx(flatten)]
    role: RoleSummary,
}

fn map_username_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::conflict(anyhow!("Username is already taken"));
        }
    }
    AppError::from(e)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &UserFilterParams) {
    qb.push(" WHERE TRUE");

    if let Some(email) = filters.email.as_deref().filter(|e| !e.is_empty()) {
        qb.push(" AND u.email ILIKE ").push_bind(contains_pattern(email));
    }
    if let Some(username) = filters.username.as_deref().filter(|u| !u.is_empty()) {
        qb.push(" AND u.username ILIKE ")
            .push_bind(contains_pattern(username));
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND u.is_active = ").push_bind(is_active);
    }
    if let Some(role) = filters.role.as_deref().filter(|r| !r.is_empty()) {
        qb.push(
            " AND EXISTS (SELECT 1 FROM user_roles ur INNER JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = u.id AND r.name = ",
        )
        .push_bind(role.to_string())
        .push(")");
    }
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", User::COLUMNS))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_user_with_roles(db: &PgPool, id: UserId) -> Result<UserWithRoles, AppError> {
        let user = Self::get_user(db, id).await?;
        let roles = Self::get_roles_for_users(db, &[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(UserWithRoles { user, roles })
    }

    #[instrument(skip(db))]
    pub async fn list_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let columns = User::COLUMNS
            .split(", ")
            .map(|c| format!("u.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut query = QueryBuilder::new(format!("SELECT {columns} FROM users u"));
        push_filters(&mut query, &filters);
        query
            .push(" ORDER BY u.created_at DESC, u.id LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());

        let users: Vec<User> = query.build_query_as().fetch_all(db).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users u");
        push_filters(&mut count, &filters);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let mut roles = Self::get_roles_for_users(db, &ids).await?;

        let data = users
            .into_iter()
            .map(|user| UserWithRoles {
                roles: roles.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect();

        Ok(PaginatedUsersResponse {
            data,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    async fn get_roles_for_users(
        db: &PgPool,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Vec<RoleSummary>>, AppError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, UserRoleRow>(
            "SELECT ur.user_id, r.id, r.name
             FROM user_roles ur
             INNER JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ANY($1)
             ORDER BY r.name",
        )
        .bind(to_uuids(user_ids))
        .fetch_all(db)
        .await?;

        let mut grouped: HashMap<UserId, Vec<RoleSummary>> = HashMap::new();
        for row in rows {
            grouped.entry(row.user_id).or_default().push(row.role);
        }

        Ok(grouped)
    }

    #[instrument(skip(db))]
    pub async fn update_profile(
        db: &PgPool,
        user_id: UserId,
        dto: UpdateProfileDto,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                 first_name = COALESCE($1, first_name),
                 last_name = COALESCE($2, last_name),
                 username = COALESCE($3, username),
                 updated_at = NOW()
             WHERE id = $4
             RETURNING {}",
            User::COLUMNS
        ))
        .bind(dto.first_name.as_deref().map(str::trim))
        .bind(dto.last_name.as_deref().map(str::trim))
        .bind(dto.username.as_deref().map(str::trim))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .map_err(map_username_conflict)?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    /// Replaces the password after checking the current one and signs the
    /// user out of every session.
    #[instrument(skip(db, dto))]
    pub async fn change_password(
        db: &PgPool,
        user_id: UserId,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let current_hash =
            sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow!("Current password is incorrect")));
        }

        if dto.current_password == dto.new_password {
            return Err(AppError::bad_request(anyhow!(
                "New password must differ from the current password"
            )));
        }

        let new_hash = hash_password(&dto.new_password)?;

        let mut tx = db.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&new_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let revoked = revoke_all_refresh_tokens(&mut *tx, user_id).await?;
        tx.commit().await?;

        info!(user_id = %user_id, revoked_sessions = revoked, "Password changed");

        Ok(())
    }

    /// Activates or deactivates an account. Deactivation revokes every
    /// refresh token of the target.
    #[instrument(skip(db))]
    pub async fn update_status(
        db: &PgPool,
        actor_id: UserId,
        user_id: UserId,
        is_active: bool,
    ) -> Result<User, AppError> {
        if actor_id == user_id && !is_active {
            return Err(AppError::bad_request(anyhow!(
                "You cannot deactivate your own account"
            )));
        }

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            User::COLUMNS
        ))
        .bind(is_active)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if !is_active {
            revoke_all_refresh_tokens(&mut *tx, user_id).await?;
        }

        tx.commit().await?;

        info!(user_id = %user_id, is_active, changed_by = %actor_id, "User status changed");

        Ok(user)
    }
}
