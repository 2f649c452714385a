//! # Unimedia Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`server`]: bind address
//! - [`jwt`]: access and refresh token settings
//! - [`cors`]: allowed origins
//! - [`email`]: SMTP settings for verification mail
//!
//! ```ignore
//! use unimedia_config::{CorsConfig, EmailConfig, JwtConfig, ServerConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let server = ServerConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod jwt;
pub mod server;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use server::ServerConfig;

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
