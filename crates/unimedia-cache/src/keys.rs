//! Cache keys and invalidation helpers.
//!
//! Permission entries are never deleted. Each entry key embeds two
//! generation counters, one shared by all users and one per user, and
//! invalidation bumps a counter instead. A reader that looked up the
//! generations before querying the database can only fill a key that later
//! readers no longer ask for, so a fill racing an invalidation is harmless.
//! Orphaned entries expire with their TTL.

use tracing::warn;
use uuid::Uuid;

use crate::{CacheError, RedisCache};

const CACHE_PREFIX: &str = "unimedia";

fn build_key(parts: &[&str]) -> String {
    format!("{}:{}", CACHE_PREFIX, parts.join(":"))
}

pub mod permissions {
    use super::*;

    /// Bumped whenever any role's grants change or a role is deleted.
    pub fn global_generation() -> String {
        build_key(&["permissions", "generation"])
    }

    /// Bumped whenever the user's role assignments change.
    pub fn user_generation(user_id: Uuid) -> String {
        build_key(&["user", &user_id.to_string(), "permissions", "generation"])
    }

    /// Effective permission names of one user at the given generations.
    pub fn user(user_id: Uuid, global: u64, user: u64) -> String {
        build_key(&[
            "user",
            &user_id.to_string(),
            "permissions",
            &format!("{global}.{user}"),
        ])
    }

    /// Key of the user's entry as of now. Must be read before the database
    /// query whose result is stored under it.
    pub async fn current_user_key(cache: &RedisCache, user_id: Uuid) -> Result<String, CacheError> {
        let generations = cache
            .counters(&[global_generation(), user_generation(user_id)])
            .await?;
        let global = generations.first().copied().unwrap_or_default();
        let own = generations.get(1).copied().unwrap_or_default();

        Ok(user(user_id, global, own))
    }
}

pub mod invalidate {
    use super::*;

    /// Call after a role is assigned to or removed from the user.
    pub async fn user_permissions(cache: Option<&RedisCache>, user_id: Uuid) {
        let Some(cache) = cache else { return };

        if let Err(e) = cache.increment(&permissions::user_generation(user_id)).await {
            warn!(error = %e, user_id = %user_id, "Failed to invalidate permission cache");
        }
    }

    /// Call after a role's grants change or a role is deleted.
    pub async fn all_permissions(cache: Option<&RedisCache>) {
        let Some(cache) = cache else { return };

        if let Err(e) = cache.increment(&permissions::global_generation()).await {
            warn!(error = %e, "Failed to invalidate permission caches");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn cache() -> RedisCache {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        RedisCache::new(&url, Duration::from_secs(60)).await.unwrap()
    }

    #[test]
    fn test_user_permissions_key() {
        let id = Uuid::from_u128(5);
        assert_eq!(
            permissions::user(id, 3, 7),
            "unimedia:user:00000000-0000-0000-0000-000000000005:permissions:3.7"
        );
        assert_eq!(
            permissions::user_generation(id),
            "unimedia:user:00000000-0000-0000-0000-000000000005:permissions:generation"
        );
    }

    #[test]
    fn test_generations_change_the_key() {
        let id = Uuid::new_v4();
        assert_ne!(permissions::user(id, 1, 0), permissions::user(id, 2, 0));
        assert_ne!(permissions::user(id, 1, 0), permissions::user(id, 1, 1));
    }

    #[tokio::test]
    async fn test_invalidate_without_cache_is_noop() {
        invalidate::user_permissions(None, Uuid::new_v4()).await;
        invalidate::all_permissions(None).await;
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_fill_racing_grant_change_is_never_read() {
        let cache = cache().await;
        let user_id = Uuid::new_v4();

        // A reader resolves its key, then a grant is revoked before it fills.
        let stale_key = permissions::current_user_key(&cache, user_id).await.unwrap();
        invalidate::all_permissions(Some(&cache)).await;
        cache
            .set(&stale_key, &vec!["users:read".to_string()])
            .await
            .unwrap();

        let fresh_key = permissions::current_user_key(&cache, user_id).await.unwrap();
        assert_ne!(fresh_key, stale_key);
        assert!(cache.get::<Vec<String>>(&fresh_key).await.is_none());
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_fill_racing_role_removal_is_never_read() {
        let cache = cache().await;
        let user_id = Uuid::new_v4();

        let stale_key = permissions::current_user_key(&cache, user_id).await.unwrap();
        invalidate::user_permissions(Some(&cache), user_id).await;
        cache
            .set(&stale_key, &vec!["roles:assign".to_string()])
            .await
            .unwrap();

        let fresh_key = permissions::current_user_key(&cache, user_id).await.unwrap();
        assert_ne!(fresh_key, stale_key);
        assert!(cache.get::<Vec<String>>(&fresh_key).await.is_none());
    }
}
