use sqlx::PgPool;
use tracing::{info, warn};

use unimedia_cache::{CacheConfig, RedisCache};
use unimedia_config::{CorsConfig, EmailConfig, JwtConfig};
use unimedia_db::{DatabaseConfig, init_db_pool};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    /// `None` when caching is disabled or Redis was unreachable at startup.
    pub cache: Option<RedisCache>,
}

impl AppState {
    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let db = init_db_pool(&DatabaseConfig::from_env()?).await?;

    Ok(AppState {
        db,
        jwt_config: JwtConfig::from_env(),
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        cache: init_cache(&CacheConfig::from_env()).await,
    })
}

async fn init_cache(config: &CacheConfig) -> Option<RedisCache> {
    if !config.enabled {
        info!("Permission cache disabled");
        return None;
    }

    match RedisCache::new(&config.redis_url, config.ttl()).await {
        Ok(cache) => {
            info!(ttl_secs = config.default_ttl_seconds, "Permission cache connected");
            Some(cache)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, running without permission cache");
            None
        }
    }
}
