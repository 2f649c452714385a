use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    assign_role_to_user, create_role, delete_role, get_role, get_user_roles, grant_permissions,
    list_roles, remove_role_from_user, revoke_permission, update_role,
};

/// Role administration. Mounted behind the admin role gate.
pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/{id}/permissions", post(grant_permissions))
        .route("/{id}/permissions/{permission_id}", delete(revoke_permission))
}

/// Nested under `/users/{id}/roles`.
pub fn init_user_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_user_roles).post(assign_role_to_user))
        .route("/{role_id}", delete(remove_role_from_user))
}
