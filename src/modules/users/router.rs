use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::modules::roles::router::init_user_roles_router;
use crate::state::AppState;

use super::controller::{
    change_password, get_profile, get_user, get_user_permissions, list_users, update_profile,
    update_user_status,
};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user))
        .route("/{id}/status", patch(update_user_status))
        .route("/{id}/permissions", get(get_user_permissions))
        .nest("/{id}/roles", init_user_roles_router())
}

pub fn init_profile_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
}
