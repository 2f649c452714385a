//! # Unimedia Auth
//!
//! Authentication primitives for the Unimedia API:
//!
//! - [`claims`]: the access-token claim set
//! - [`jwt`]: signing and verifying access tokens (HS256)
//! - [`tokens`]: opaque refresh and verification tokens
//!
//! Access tokens are short-lived JWTs carrying the user's role names. Refresh
//! tokens are random opaque strings; only their SHA-256 hash is persisted so a
//! leaked table cannot be replayed.
//!
//! ```ignore
//! use unimedia_auth::{create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, &email, &username, roles, &jwt_config)?;
//! let claims = verify_token(&token, &jwt_config)?;
//! assert!(claims.has_role("admin"));
//! ```

pub mod claims;
pub mod jwt;
pub mod tokens;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
pub use tokens::{generate_opaque_token, hash_token};
