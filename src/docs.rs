use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use unimedia_core::{PaginationMeta, PaginationParams};
use unimedia_models::{
    AssignPermissionsDto, AssignRoleToUserDto, AssignedRole, ChangePasswordDto,
    CreatePermissionDto, CreateRoleDto, LoginRequest, LoginResponse, LogoutRequest, MeResponse,
    MessageResponse, PaginatedPermissionsResponse, PaginatedRolesResponse, PaginatedUsersResponse,
    Permission, PermissionId, RefreshTokenRequest, RegisterRequest, Role, RoleAssignmentResponse,
    RoleId, RoleSummary, RoleWithPermissions, TokenResponse, UpdateProfileDto, UpdateRoleDto,
    UpdateUserStatusDto, User, UserId, UserPermissionsResponse, UserWithRoles, VerifyEmailRequest,
};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::logout_all,
        crate::modules::auth::controller::verify_email,
        crate::modules::auth::controller::me,
        crate::modules::users::controller::get_profile,
        crate::modules::users::controller::update_profile,
        crate::modules::users::controller::change_password,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user_status,
        crate::modules::users::controller::get_user_permissions,
        crate::modules::roles::controller::get_user_roles,
        crate::modules::roles::controller::assign_role_to_user,
        crate::modules::roles::controller::remove_role_from_user,
        crate::modules::roles::controller::list_roles,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::get_role,
        crate::modules::roles::controller::update_role,
        crate::modules::roles::controller::delete_role,
        crate::modules::roles::controller::grant_permissions,
        crate::modules::roles::controller::revoke_permission,
        crate::modules::permissions::controller::list_permissions,
        crate::modules::permissions::controller::get_permission,
        crate::modules::permissions::controller::create_permission,
        crate::modules::permissions::controller::delete_permission,
    ),
    components(
        schemas(
            UserId,
            RoleId,
            PermissionId,
            User,
            UserWithRoles,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshTokenRequest,
            TokenResponse,
            LogoutRequest,
            VerifyEmailRequest,
            MeResponse,
            MessageResponse,
            UpdateProfileDto,
            ChangePasswordDto,
            UpdateUserStatusDto,
            PaginatedUsersResponse,
            Role,
            RoleSummary,
            RoleWithPermissions,
            AssignedRole,
            CreateRoleDto,
            UpdateRoleDto,
            AssignPermissionsDto,
            AssignRoleToUserDto,
            RoleAssignmentResponse,
            PaginatedRolesResponse,
            Permission,
            CreatePermissionDto,
            PaginatedPermissionsResponse,
            UserPermissionsResponse,
            PaginationMeta,
            PaginationParams,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and token lifecycle"),
        (name = "Profile", description = "The caller's own account"),
        (name = "Users", description = "User administration"),
        (name = "User Roles", description = "Role assignments of a user"),
        (name = "Roles", description = "Role administration (admin role required)"),
        (name = "Permissions", description = "Permission catalogue")
    ),
    info(
        title = "Unimedia API",
        version = "0.1.0",
        description = "Users, authentication and role-based access control for the Unimedia media manager.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
