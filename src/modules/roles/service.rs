use std::collections::HashMap;

use anyhow::anyhow;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use unimedia_cache::{RedisCache, invalidate};
use unimedia_core::{AppError, PaginationMeta, search::contains_pattern};
use unimedia_models::{
    AssignedRole, CreateRoleDto, PaginatedRolesResponse, Permission, PermissionId, Role,
    RoleAssignmentResponse, RoleFilterParams, RoleId, RoleWithPermissions, UpdateRoleDto, UserId,
    ids::to_uuids,
};

const ROLE_COLUMNS: &str = "id, name, description, is_system, created_at, updated_at";

#[derive(FromRow)]
struct RolePermissionRow {
    role_id: RoleId,
    #[sqlx(flatten)]
    permission: Permission,
}

fn map_role_name_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::conflict(anyhow!("A role with this name already exists"));
        }
    }
    AppError::from(e)
}

// ============ Roles ============

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &RoleFilterParams) {
    qb.push(" WHERE TRUE");

    if let Some(is_system) = params.is_system {
        qb.push(" AND is_system = ").push_bind(is_system);
    }
    if let Some(name) = params.name.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
}

#[instrument(skip(db))]
pub async fn list_roles(
    db: &PgPool,
    params: RoleFilterParams,
) -> Result<PaginatedRolesResponse, AppError> {
    let mut query = QueryBuilder::new(format!("SELECT {ROLE_COLUMNS} FROM roles"));
    push_filters(&mut query, &params);
    query
        .push(" ORDER BY name LIMIT ")
        .push_bind(params.pagination.limit())
        .push(" OFFSET ")
        .push_bind(params.pagination.offset());

    let roles: Vec<Role> = query.build_query_as().fetch_all(db).await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM roles");
    push_filters(&mut count, &params);
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let role_ids: Vec<RoleId> = roles.iter().map(|r| r.id).collect();
    let mut grouped = get_permissions_for_roles(db, &role_ids).await?;

    let data = roles
        .into_iter()
        .map(|role| RoleWithPermissions {
            permissions: grouped.remove(&role.id).unwrap_or_default(),
            role,
        })
        .collect();

    Ok(PaginatedRolesResponse {
        data,
        meta: PaginationMeta::new(total, &params.pagination),
    })
}

async fn find_role<'e>(db: impl PgExecutor<'e>, id: RoleId) -> Result<Role, AppError> {
    sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Role not found")))
}

#[instrument(skip(db))]
pub async fn get_role(db: &PgPool, id: RoleId) -> Result<RoleWithPermissions, AppError> {
    let role = find_role(db, id).await?;
    let permissions = get_role_permissions(db, id).await?;

    Ok(RoleWithPermissions { role, permissions })
}

#[instrument(skip(db))]
pub async fn create_role(
    db: &PgPool,
    dto: CreateRoleDto,
    created_by: UserId,
) -> Result<RoleWithPermissions, AppError> {
    let mut tx = db.begin().await?;

    let role = sqlx::query_as::<_, Role>(&format!(
        "INSERT INTO roles (name, description, is_system) VALUES ($1, $2, FALSE) \
         RETURNING {ROLE_COLUMNS}"
    ))
    .bind(&dto.name)
    .bind(&dto.description)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_role_name_conflict)?;

    if let Some(permission_ids) = dto.permission_ids.as_deref() {
        grant_permissions_in_tx(&mut tx, role.id, permission_ids, created_by).await?;
    }

    let permissions = get_role_permissions(&mut *tx, role.id).await?;
    tx.commit().await?;

    info!(role = %role.name, created_by = %created_by, "Role created");

    Ok(RoleWithPermissions { role, permissions })
}

/// Updates the description. Role names are immutable because role gates
/// match on them.
#[instrument(skip(db))]
pub async fn update_role(
    db: &PgPool,
    id: RoleId,
    dto: UpdateRoleDto,
) -> Result<RoleWithPermissions, AppError> {
    let existing = find_role(db, id).await?;

    if let Some(name) = dto.name.as_deref() {
        if name != existing.name {
            return Err(AppError::bad_request(anyhow!("Role name cannot be changed")));
        }
    }

    let role = sqlx::query_as::<_, Role>(&format!(
        "UPDATE roles SET description = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING {ROLE_COLUMNS}"
    ))
    .bind(dto.description.or(existing.description))
    .bind(id)
    .fetch_one(db)
    .await?;

    let permissions = get_role_permissions(db, id).await?;

    Ok(RoleWithPermissions { role, permissions })
}

#[instrument(skip(db, cache))]
pub async fn delete_role(
    db: &PgPool,
    cache: Option<&RedisCache>,
    id: RoleId,
) -> Result<(), AppError> {
    let role = find_role(db, id).await?;

    if role.is_system {
        return Err(AppError::forbidden("System roles cannot be deleted".to_string()));
    }

    sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    invalidate::all_permissions(cache).await;
    info!(role = %role.name, "Role deleted");

    Ok(())
}

// ============ Role permissions ============

pub async fn get_role_permissions<'e>(
    db: impl PgExecutor<'e>,
    role_id: RoleId,
) -> Result<Vec<Permission>, AppError> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT p.id, p.name, p.description, p.created_at, p.updated_at
         FROM permissions p
         INNER JOIN role_permissions rp ON rp.permission_id = p.id
         WHERE rp.role_id = $1
         ORDER BY p.name",
    )
    .bind(role_id)
    .fetch_all(db)
    .await?;

    Ok(permissions)
}

async fn get_permissions_for_roles(
    db: &PgPool,
    role_ids: &[RoleId],
) -> Result<HashMap<RoleId, Vec<Permission>>, AppError> {
    if role_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, RolePermissionRow>(
        "SELECT rp.role_id, p.id, p.name, p.description, p.created_at, p.updated_at
         FROM permissions p
         INNER JOIN role_permissions rp ON rp.permission_id = p.id
         WHERE rp.role_id = ANY($1)
         ORDER BY p.name",
    )
    .bind(to_uuids(role_ids))
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<RoleId, Vec<Permission>> = HashMap::new();
    for row in rows {
        grouped.entry(row.role_id).or_default().push(row.permission);
    }

    Ok(grouped)
}

/// Grants every id in `permission_ids`, which must all exist. Already granted
/// permissions are left untouched.
async fn grant_permissions_in_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    role_id: RoleId,
    permission_ids: &[PermissionId],
    granted_by: UserId,
) -> Result<(), AppError> {
    let mut ids = to_uuids(permission_ids);
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(());
    }

    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM permissions WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&mut **tx)
        .await?;

    if found != ids.len() as i64 {
        return Err(AppError::bad_request(anyhow!(
            "One or more permission ids do not exist"
        )));
    }

    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id, granted_by)
         SELECT $1, UNNEST($2::uuid[]), $3
         ON CONFLICT (role_id, permission_id) DO NOTHING",
    )
    .bind(role_id)
    .bind(&ids)
    .bind(granted_by)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[instrument(skip(db, cache))]
pub async fn grant_permissions(
    db: &PgPool,
    cache: Option<&RedisCache>,
    role_id: RoleId,
    permission_ids: &[PermissionId],
    granted_by: UserId,
) -> Result<RoleWithPermissions, AppError> {
    let mut tx = db.begin().await?;

    let role = find_role(&mut *tx, role_id).await?;
    grant_permissions_in_tx(&mut tx, role_id, permission_ids, granted_by).await?;
    let permissions = get_role_permissions(&mut *tx, role_id).await?;

    tx.commit().await?;
    invalidate::all_permissions(cache).await;

    Ok(RoleWithPermissions { role, permissions })
}

#[instrument(skip(db, cache))]
pub async fn revoke_permission(
    db: &PgPool,
    cache: Option<&RedisCache>,
    role_id: RoleId,
    permission_id: PermissionId,
) -> Result<RoleWithPermissions, AppError> {
    let role = find_role(db, role_id).await?;

    let result =
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(anyhow!(
            "Permission is not granted to this role"
        )));
    }

    invalidate::all_permissions(cache).await;
    let permissions = get_role_permissions(db, role_id).await?;

    Ok(RoleWithPermissions { role, permissions })
}

// ============ User roles ============

pub async fn get_user_role_names<'e>(
    db: impl PgExecutor<'e>,
    user_id: UserId,
) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT r.name FROM roles r
         INNER JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = $1
         ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(names)
}

async fn ensure_user_exists(db: &PgPool, user_id: UserId) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(db)
        .await?;

    if !exists {
        return Err(AppError::not_found(anyhow!("User not found")));
    }

    Ok(())
}

#[instrument(skip(db))]
pub async fn get_user_roles(db: &PgPool, user_id: UserId) -> Result<Vec<AssignedRole>, AppError> {
    ensure_user_exists(db, user_id).await?;

    let roles = sqlx::query_as::<_, AssignedRole>(
        "SELECT r.id, r.name, r.description, r.is_system, ur.assigned_at, ur.assigned_by
         FROM roles r
         INNER JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = $1
         ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(roles)
}

#[instrument(skip(db, cache))]
pub async fn assign_role_to_user(
    db: &PgPool,
    cache: Option<&RedisCache>,
    user_id: UserId,
    role_id: RoleId,
    assigned_by: UserId,
) -> Result<RoleAssignmentResponse, AppError> {
    ensure_user_exists(db, user_id).await?;
    let role = find_role(db, role_id).await?;

    let result = sqlx::query(
        "INSERT INTO user_roles (user_id, role_id, assigned_by) VALUES ($1, $2, $3)
         ON CONFLICT (user_id, role_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(role_id)
    .bind(assigned_by)
    .execute(db)
    .await?;

    let message = if result.rows_affected() == 0 {
        "User already has this role"
    } else {
        invalidate::user_permissions(cache, user_id.into_inner()).await;
        info!(user_id = %user_id, role = %role.name, assigned_by = %assigned_by, "Role assigned");
        "Role assigned successfully"
    };

    Ok(RoleAssignmentResponse {
        message: message.to_string(),
        user_id,
        role_id,
    })
}

#[instrument(skip(db, cache))]
pub async fn remove_role_from_user(
    db: &PgPool,
    cache: Option<&RedisCache>,
    user_id: UserId,
    role_id: RoleId,
) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
        .bind(user_id)
        .bind(role_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(anyhow!("User does not have this role")));
    }

    invalidate::user_permissions(cache, user_id.into_inner()).await;
    info!(user_id = %user_id, role_id = %role_id, "Role removed");

    Ok(())
}
