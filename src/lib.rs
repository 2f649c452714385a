//! # Unimedia API
//!
//! Admin backend for a unified media management service: user accounts, JWT
//! authentication and role-based access control on PostgreSQL, with an
//! optional Redis cache for permission checks.
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── unimedia-core/    # AppError, pagination, password hashing, role/permission names
//! ├── unimedia-config/  # env-driven configuration
//! ├── unimedia-db/      # pool + migrations
//! ├── unimedia-auth/    # claims, JWT, opaque tokens
//! ├── unimedia-models/  # entities and DTOs
//! ├── unimedia-cache/   # Redis permission cache
//! └── unimedia-cli/     # create-admin, assign-role
//! src/
//! ├── middleware/       # AuthUser, role gate, permission gate
//! └── modules/          # auth, users (+ profile), roles, permissions
//! ```
//!
//! Each feature module has `controller.rs` (handlers), `service.rs`
//! (queries and rules) and `router.rs`.
//!
//! ## Authorization
//!
//! - **Role gate**: `/api/roles` requires the `admin` role, checked against
//!   the roles claimed in the access token. No database access.
//! - **Permission gate**: extractors such as `RequireUsersRead` resolve the
//!   caller's permissions through `user_roles -> role_permissions ->
//!   permissions` on every request.
//!
//! Access tokens are short-lived JWTs. Refresh tokens are opaque, stored
//! hashed, and rotated on every use.

pub mod docs;
pub mod email;
pub mod logging;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod validator;

pub use unimedia_auth;
pub use unimedia_cache;
pub use unimedia_config;
pub use unimedia_core;
pub use unimedia_db;
pub use unimedia_models;
