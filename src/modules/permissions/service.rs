use anyhow::anyhow;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{instrument, warn};

use unimedia_cache::{RedisCache, keys};
use unimedia_core::{AppError, PaginationMeta};
use unimedia_models::{
    CreatePermissionDto, PaginatedPermissionsResponse, Permission, PermissionFilterParams,
    PermissionId, UserId,
};

const PERMISSION_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &PermissionFilterParams) {
    qb.push(" WHERE TRUE");

    if let Some(resource) = params.resource.as_deref().filter(|r| !r.is_empty()) {
        qb.push(" AND split_part(name, ':', 1) = ")
            .push_bind(resource.to_string());
    }
}

#[instrument(skip(db))]
pub async fn list_permissions(
    db: &PgPool,
    params: PermissionFilterParams,
) -> Result<PaginatedPermissionsResponse, AppError> {
    let mut query = QueryBuilder::new(format!("SELECT {PERMISSION_COLUMNS} FROM permissions"));
    push_filters(&mut query, &params);
    query
        .push(" ORDER BY name LIMIT ")
        .push_bind(params.pagination.limit())
        .push(" OFFSET ")
        .push_bind(params.pagination.offset());

    let permissions: Vec<Permission> = query.build_query_as().fetch_all(db).await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM permissions");
    push_filters(&mut count, &params);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    Ok(PaginatedPermissionsResponse {
        data: permissions,
        meta: PaginationMeta::new(total, &params.pagination),
    })
}

#[instrument(skip(db))]
pub async fn get_permission(db: &PgPool, id: PermissionId) -> Result<Permission, AppError> {
    sqlx::query_as::<_, Permission>(&format!(
        "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Permission not found")))
}

#[instrument(skip(db))]
pub async fn create_permission(
    db: &PgPool,
    dto: CreatePermissionDto,
) -> Result<Permission, AppError> {
    sqlx::query_as::<_, Permission>(&format!(
        "INSERT INTO permissions (name, description) VALUES ($1, $2) \
         RETURNING {PERMISSION_COLUMNS}"
    ))
    .bind(dto.name.trim())
    .bind(dto.description)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::conflict(anyhow!("A permission with this name already exists"));
            }
        }
        AppError::from(e)
    })
}

/// Deletes a permission that no role references.
///
/// The row is locked first, so a concurrent grant either commits before the
/// reference count is taken or waits until the delete is done and then fails
/// its foreign key check.
#[instrument(skip(db))]
pub async fn delete_permission(db: &PgPool, id: PermissionId) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    let exists = sqlx::query_scalar::<_, PermissionId>(
        "SELECT id FROM permissions WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    if exists.is_none() {
        return Err(AppError::not_found(anyhow!("Permission not found")));
    }

    let role_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM role_permissions WHERE permission_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if role_count > 0 {
        return Err(AppError::conflict(anyhow!(
            "Permission is granted to {role_count} role(s); revoke it from every role first"
        )));
    }

    sqlx::query("DELETE FROM permissions WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::conflict(anyhow!("Permission is granted to a role"));
                }
            }
            AppError::from(e)
        })?;

    tx.commit().await?;

    Ok(())
}

/// Distinct permissions reachable through the user's roles.
#[instrument(skip(db))]
pub async fn get_user_permissions(
    db: &PgPool,
    user_id: UserId,
) -> Result<Vec<Permission>, AppError> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT DISTINCT p.id, p.name, p.description, p.created_at, p.updated_at
         FROM permissions p
         INNER JOIN role_permissions rp ON rp.permission_id = p.id
         INNER JOIN user_roles ur ON ur.role_id = rp.role_id
         WHERE ur.user_id = $1
         ORDER BY p.name",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(permissions)
}

/// Effective permission names of a user, served from the cache when present.
#[instrument(skip(db, cache))]
pub async fn effective_permission_names(
    db: &PgPool,
    cache: Option<&RedisCache>,
    user_id: UserId,
) -> Result<Vec<String>, AppError> {
    // Resolved before the query so a concurrent invalidation orphans this fill.
    let cached = match cache {
        Some(cache) => match keys::permissions::current_user_key(cache, user_id.into_inner()).await {
            Ok(key) => Some((cache, key)),
            Err(e) => {
                warn!(error = %e, user_id = %user_id, "Permission cache unavailable");
                None
            }
        },
        None => None,
    };

    if let Some((cache, key)) = &cached {
        if let Some(names) = cache.get::<Vec<String>>(key).await {
            return Ok(names);
        }
    }

    let names = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT p.name
         FROM permissions p
         INNER JOIN role_permissions rp ON rp.permission_id = p.id
         INNER JOIN user_roles ur ON ur.role_id = rp.role_id
         WHERE ur.user_id = $1
         ORDER BY p.name",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    if let Some((cache, key)) = &cached {
        if let Err(e) = cache.set(key, &names).await {
            warn!(error = %e, user_id = %user_id, "Failed to cache permissions");
        }
    }

    Ok(names)
}

/// Answers the permission gate for one request.
#[instrument(skip(db, cache))]
pub async fn user_has_permission(
    db: &PgPool,
    cache: Option<&RedisCache>,
    user_id: UserId,
    permission: &str,
) -> Result<bool, AppError> {
    if cache.is_some() {
        let names = effective_permission_names(db, cache, user_id).await?;
        return Ok(names.iter().any(|name| name == permission));
    }

    let allowed = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
             SELECT 1
             FROM user_roles ur
             INNER JOIN role_permissions rp ON rp.role_id = ur.role_id
             INNER JOIN permissions p ON p.id = rp.permission_id
             WHERE ur.user_id = $1 AND p.name = $2
         )",
    )
    .bind(user_id)
    .bind(permission)
    .fetch_one(db)
    .await?;

    Ok(allowed)
}
