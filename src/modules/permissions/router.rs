use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{create_permission, delete_permission, get_permission, list_permissions};

pub fn init_permissions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route("/{id}", get(get_permission).delete(delete_permission))
}
