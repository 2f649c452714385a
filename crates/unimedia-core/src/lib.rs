//! # Unimedia Core
//!
//! Foundational types shared by every Unimedia crate:
//!
//! - [`errors`]: [`AppError`], the HTTP-aware error type returned by handlers and services
//! - [`pagination`]: page-based pagination parameters and response metadata
//! - [`password`]: bcrypt hashing and verification
//! - [`permissions`]: permission name constants and `resource:action` parsing
//! - [`roles`]: names and ids of the seeded roles
//! - [`search`]: escaped substring patterns for `ILIKE` filters
//! - [`serde`]: lenient deserializers for query-string parameters
//!
//! # Example
//!
//! ```ignore
//! use unimedia_core::{AppError, hash_password, permissions};
//!
//! let hash = hash_password("correct horse battery staple")?;
//! if !auth_user.has_role(unimedia_core::roles::ADMIN) {
//!     return Err(AppError::forbidden("Admin role required".to_string()));
//! }
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod search;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
