use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use unimedia_core::AppError;
use unimedia_models::{
    ChangePasswordDto, MessageResponse, PaginatedUsersResponse, UpdateProfileDto,
    UpdateUserStatusDto, User, UserFilterParams, UserId, UserPermissionsResponse, UserWithRoles,
};

use crate::middleware::auth::AuthUser;
use crate::middleware::permission::{RequireRolesRead, RequireUsersRead, RequireUsersWrite};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::permissions::service as permission_service;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::UserService;

// ============ Profile ============

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Own account", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = UserService::get_user(&state.db, auth_user.user_id()?).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    request_body = UpdateProfileDto,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<UpdateProfileDto>,
) -> Result<Json<User>, AppError> {
    let user = UserService::update_profile(&state.db, auth_user.user_id()?, dto).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/profile/change-password",
    request_body = ChangePasswordDto,
    responses(
        (status = 200, description = "Password changed; all sessions signed out", body = MessageResponse),
        (status = 400, description = "Current password is incorrect", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Profile",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ChangePasswordDto>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::change_password(&state.db, auth_user.user_id()?, dto).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

// ============ User administration ============

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserFilterParams),
    responses(
        (status = 200, description = "Users with their roles", body = PaginatedUsersResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing users:read", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn list_users(
    State(state): State<AppState>,
    _auth: RequireUsersRead,
    Query(filters): Query<UserFilterParams>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    Ok(Json(UserService::list_users(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with roles", body = UserWithRoles),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing users:read", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: RequireUsersRead,
    Path(id): Path<UserId>,
) -> Result<Json<UserWithRoles>, AppError> {
    Ok(Json(UserService::get_user_with_roles(&state.db, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    params(("id" = UserId, Path, description = "User ID")),
    request_body = UpdateUserStatusDto,
    responses(
        (status = 200, description = "Status updated", body = User),
        (status = 400, description = "Cannot deactivate own account", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing users:write", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth))]
pub async fn update_user_status(
    State(state): State<AppState>,
    RequireUsersWrite(auth): RequireUsersWrite,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserStatusDto>,
) -> Result<Json<User>, AppError> {
    let user = UserService::update_status(&state.db, auth.user_id()?, id, dto.is_active).await?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/permissions",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "Effective permissions of the user", body = UserPermissionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing roles:read", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth))]
pub async fn get_user_permissions(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
    Path(id): Path<UserId>,
) -> Result<Json<UserPermissionsResponse>, AppError> {
    let user = UserService::get_user(&state.db, id).await?;
    let permissions = permission_service::get_user_permissions(&state.db, user.id).await?;

    Ok(Json(UserPermissionsResponse {
        user_id: user.id,
        permissions,
    }))
}
