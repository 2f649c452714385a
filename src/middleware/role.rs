//! Role gate for route groups.
//!
//! Roles are read from the access token only. A role removed from a user
//! takes effect when their current access token expires.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use unimedia_core::{AppError, roles};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Passes the request on when the caller holds at least one of `allowed_roles`.
///
/// ```rust,ignore
/// let moderated = Router::new()
///     .route("/queue", get(queue_handler))
///     .route_layer(middleware::from_fn_with_state(
///         state.clone(),
///         |state, req, next| require_roles(state, req, next, &[roles::ADMIN, roles::MODERATOR]),
///     ));
/// ```
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: &[&str],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;
    check_any_role(&auth_user, allowed_roles)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, &[roles::ADMIN]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub fn check_any_role(auth_user: &AuthUser, allowed_roles: &[&str]) -> Result<(), AppError> {
    if auth_user.has_any_role(allowed_roles) {
        return Ok(());
    }

    Err(AppError::forbidden(format!(
        "Access denied. Required role: {}",
        allowed_roles.join(" or ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use unimedia_auth::Claims;
    use uuid::Uuid;

    fn user_with_roles(roles: &[&str]) -> AuthUser {
        AuthUser(Claims {
            sub: Uuid::new_v4().to_string(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 9999999999,
            iat: 1234567890,
            jti: Uuid::new_v4().to_string(),
        })
    }

    #[test]
    fn test_check_any_role_allows_member() {
        let user = user_with_roles(&[roles::MODERATOR, roles::ADMIN]);
        assert!(check_any_role(&user, &[roles::ADMIN]).is_ok());
    }

    #[test]
    fn test_check_any_role_forbids_non_member() {
        let user = user_with_roles(&[roles::USER]);
        let err = check_any_role(&user, &[roles::ADMIN, roles::MODERATOR]).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
        assert_eq!(
            err.error.to_string(),
            "Access denied. Required role: admin or moderator"
        );
    }

    #[test]
    fn test_role_names_are_case_sensitive() {
        let user = user_with_roles(&["Admin"]);
        assert!(check_any_role(&user, &[roles::ADMIN]).is_err());
    }
}
