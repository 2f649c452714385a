//! # Unimedia Cache
//!
//! Optional Redis cache in front of the permission join.
//!
//! Each user's effective permission names are cached under
//! [`keys::permissions::current_user_key`]. That key moves on when the user's
//! roles change, and every user's key moves on when any role's permissions
//! change, so stale entries are never read again.
//! Every helper takes `Option<&RedisCache>` so callers work unchanged when
//! caching is disabled, and cache failures are logged rather than returned.
//!
//! ```ignore
//! use unimedia_cache::{CacheConfig, RedisCache, invalidate};
//!
//! let config = CacheConfig::from_env();
//! let cache = RedisCache::new(&config.redis_url, config.ttl()).await?;
//! invalidate::user_permissions(Some(&cache), user_id).await;
//! ```

pub mod config;
pub mod keys;
pub mod redis;

pub use config::CacheConfig;
pub use keys::invalidate;
pub use redis::{CacheError, RedisCache};
