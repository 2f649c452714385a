//! Authentication and authorization for handlers.
//!
//! - [`auth`]: the [`AuthUser`](auth::AuthUser) extractor, which validates the
//!   bearer token
//! - [`role`]: route-layer middleware that checks the roles claimed in the token
//! - [`permission`]: extractors that resolve permissions from the database
//!
//! ```ignore
//! use crate::middleware::permission::RequireUsersRead;
//!
//! async fn list_users(RequireUsersRead(auth_user): RequireUsersRead) -> impl IntoResponse {
//!     // Only runs when the caller currently holds "users:read"
//! }
//! ```

pub mod auth;
pub mod permission;
pub mod role;
