use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use unimedia_core::AppError;
use unimedia_models::{
    AssignPermissionsDto, AssignRoleToUserDto, AssignedRole, CreateRoleDto,
    PaginatedRolesResponse, PermissionId, RoleAssignmentResponse, RoleFilterParams, RoleId,
    RoleWithPermissions, UpdateRoleDto, UserId,
};

use crate::middleware::auth::AuthUser;
use crate::middleware::permission::{RequireRolesAssign, RequireRolesRead};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

// ============ Role endpoints (admin role gate) ============

#[utoipa::path(
    get,
    path = "/api/roles",
    params(RoleFilterParams),
    responses(
        (status = 200, description = "Roles with their permissions", body = PaginatedRolesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_roles(
    State(state): State<AppState>,
    Query(params): Query<RoleFilterParams>,
) -> Result<Json<PaginatedRolesResponse>, AppError> {
    Ok(Json(service::list_roles(&state.db, params).await?))
}

#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = RoleWithPermissions),
        (status = 400, description = "Unknown permission id", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Role name already exists", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn create_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<RoleWithPermissions>), AppError> {
    let role = service::create_role(&state.db, dto, auth_user.user_id()?).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role with permissions", body = RoleWithPermissions),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    Ok(Json(service::get_role(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    request_body = UpdateRoleDto,
    responses(
        (status = 200, description = "Role updated", body = RoleWithPermissions),
        (status = 400, description = "Attempt to rename the role", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    Ok(Json(service::update_role(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    params(("id" = RoleId, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required, or system role", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<StatusCode, AppError> {
    service::delete_role(&state.db, state.cache(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/roles/{id}/permissions",
    params(("id" = RoleId, Path, description = "Role ID")),
    request_body = AssignPermissionsDto,
    responses(
        (status = 200, description = "Permissions granted", body = RoleWithPermissions),
        (status = 400, description = "Unknown permission id", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn grant_permissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<RoleId>,
    ValidatedJson(dto): ValidatedJson<AssignPermissionsDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::grant_permissions(
        &state.db,
        state.cache(),
        id,
        &dto.permission_ids,
        auth_user.user_id()?,
    )
    .await?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}/permissions/{permission_id}",
    params(
        ("id" = RoleId, Path, description = "Role ID"),
        ("permission_id" = PermissionId, Path, description = "Permission ID")
    ),
    responses(
        (status = 200, description = "Permission revoked", body = RoleWithPermissions),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Role not found or permission not granted", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn revoke_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::revoke_permission(&state.db, state.cache(), id, permission_id).await?;
    Ok(Json(role))
}

// ============ User role endpoints (permission gate) ============

#[utoipa::path(
    get,
    path = "/api/users/{id}/roles",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles assigned to the user", body = Vec<AssignedRole>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing roles:read", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_user_roles(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<AssignedRole>>, AppError> {
    Ok(Json(service::get_user_roles(&state.db, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/roles",
    params(("id" = UserId, Path, description = "User ID")),
    request_body = AssignRoleToUserDto,
    responses(
        (status = 200, description = "Role assigned, or already held", body = RoleAssignmentResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing roles:assign", body = ErrorResponse),
        (status = 404, description = "User or role not found", body = ErrorResponse)
    ),
    tag = "User Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth))]
pub async fn assign_role_to_user(
    State(state): State<AppState>,
    RequireRolesAssign(auth): RequireRolesAssign,
    Path(user_id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<AssignRoleToUserDto>,
) -> Result<Json<RoleAssignmentResponse>, AppError> {
    let response = service::assign_role_to_user(
        &state.db,
        state.cache(),
        user_id,
        dto.role_id,
        auth.user_id()?,
    )
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/roles/{role_id}",
    params(
        ("id" = UserId, Path, description = "User ID"),
        ("role_id" = RoleId, Path, description = "Role ID")
    ),
    responses(
        (status = 204, description = "Role removed"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing roles:assign", body = ErrorResponse),
        (status = 404, description = "Role not assigned to the user", body = ErrorResponse)
    ),
    tag = "User Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn remove_role_from_user(
    State(state): State<AppState>,
    _auth: RequireRolesAssign,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<StatusCode, AppError> {
    service::remove_role_from_user(&state.db, state.cache(), user_id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
