//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use geofeed_core::services::DEFAULT_AUDIT_TIMEOUT;
use geofeed_infra::{DatabaseConfig, InMemoryJobQueueConfig};

#[cfg(feature = "redis")]
use geofeed_infra::RedisConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// `None` keeps counters and labels in process memory.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub jobs: InMemoryJobQueueConfig,
    pub audit_timeout: Duration,
    pub geocoder_enabled: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            jobs: InMemoryJobQueueConfig::from_env(),
            audit_timeout: env::var("AUDIT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_AUDIT_TIMEOUT),
            geocoder_enabled: env::var("GEOCODER_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}
