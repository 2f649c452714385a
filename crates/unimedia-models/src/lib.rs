//! # Unimedia Models
//!
//! Domain entities and request/response DTOs shared by the API and the CLI.
//!
//! - [`ids`]: strongly-typed UUID wrappers
//! - [`users`]: accounts and profile DTOs
//! - [`roles`]: roles, permissions and their assignments
//! - [`auth`]: login, refresh and verification payloads

pub mod auth;
pub mod ids;
pub mod roles;
pub mod users;

pub use ids::{PermissionId, RefreshTokenId, RoleId, UserId};

pub use auth::{
    LoginRequest, LoginResponse, LogoutRequest, MeResponse, MessageResponse, RefreshTokenRequest,
    TokenResponse, VerifyEmailRequest,
};

pub use roles::{
    AssignPermissionsDto, AssignRoleToUserDto, AssignedRole, CreatePermissionDto, CreateRoleDto,
    PaginatedPermissionsResponse, PaginatedRolesResponse, Permission, PermissionFilterParams,
    Role, RoleAssignmentResponse, RoleFilterParams, RoleSummary, RoleWithPermissions,
    UpdateRoleDto, UserPermissionsResponse,
};

pub use users::{
    ChangePasswordDto, PaginatedUsersResponse, RegisterRequest, UpdateProfileDto,
    UpdateUserStatusDto, User, UserFilterParams, UserRecord, UserWithRoles,
};
