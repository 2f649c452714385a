use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use unimedia_core::AppError;
use unimedia_models::{
    CreatePermissionDto, PaginatedPermissionsResponse, Permission, PermissionFilterParams,
    PermissionId,
};

use crate::middleware::permission::{RequirePermissionsRead, RequirePermissionsWrite};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

#[utoipa::path(
    get,
    path = "/api/permissions",
    params(PermissionFilterParams),
    responses(
        (status = 200, description = "Permissions", body = PaginatedPermissionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing permissions:read", body = ErrorResponse)
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_permissions(
    State(state): State<AppState>,
    _auth: RequirePermissionsRead,
    Query(params): Query<PermissionFilterParams>,
) -> Result<Json<PaginatedPermissionsResponse>, AppError> {
    Ok(Json(service::list_permissions(&state.db, params).await?))
}

#[utoipa::path(
    get,
    path = "/api/permissions/{id}",
    params(("id" = PermissionId, Path, description = "Permission ID")),
    responses(
        (status = 200, description = "Permission", body = Permission),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing permissions:read", body = ErrorResponse),
        (status = 404, description = "Permission not found", body = ErrorResponse)
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_permission(
    State(state): State<AppState>,
    _auth: RequirePermissionsRead,
    Path(id): Path<PermissionId>,
) -> Result<Json<Permission>, AppError> {
    Ok(Json(service::get_permission(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/permissions",
    request_body = CreatePermissionDto,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing permissions:write", body = ErrorResponse),
        (status = 409, description = "Name already exists", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth))]
pub async fn create_permission(
    State(state): State<AppState>,
    RequirePermissionsWrite(auth): RequirePermissionsWrite,
    ValidatedJson(dto): ValidatedJson<CreatePermissionDto>,
) -> Result<(StatusCode, Json<Permission>), AppError> {
    let permission = service::create_permission(&state.db, dto).await?;
    tracing::info!(permission = %permission.name, created_by = %auth.email(), "Permission created");
    Ok((StatusCode::CREATED, Json(permission)))
}

#[utoipa::path(
    delete,
    path = "/api/permissions/{id}",
    params(("id" = PermissionId, Path, description = "Permission ID")),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing permissions:write", body = ErrorResponse),
        (status = 404, description = "Permission not found", body = ErrorResponse),
        (status = 409, description = "Permission still granted to a role", body = ErrorResponse)
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn delete_permission(
    State(state): State<AppState>,
    _auth: RequirePermissionsWrite,
    Path(id): Path<PermissionId>,
) -> Result<StatusCode, AppError> {
    service::delete_permission(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
