//! Permission extractors.
//!
//! Unlike the role gate these never trust the token: each check resolves the
//! caller's effective permissions through their current role assignments, so
//! revoking a grant takes effect on the next request.

use unimedia_core::permissions;

/// Defines an extractor that requires the caller to hold `$permission`.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = unimedia_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user = <$crate::middleware::auth::AuthUser as axum::extract::FromRequestParts<
                    $crate::state::AppState,
                >>::from_request_parts(parts, state)
                .await?;

                let allowed = $crate::modules::permissions::service::user_has_permission(
                    &state.db,
                    state.cache(),
                    auth_user.user_id()?,
                    $permission,
                )
                .await?;

                if !allowed {
                    return Err(unimedia_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_permission!(RequireUsersRead, permissions::USERS_READ);
require_permission!(RequireUsersWrite, permissions::USERS_WRITE);

require_permission!(RequireRolesRead, permissions::ROLES_READ);
require_permission!(RequireRolesAssign, permissions::ROLES_ASSIGN);

require_permission!(RequirePermissionsRead, permissions::PERMISSIONS_READ);
require_permission!(RequirePermissionsWrite, permissions::PERMISSIONS_WRITE);
