//! Redis-backed cache and like counters.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use geofeed_core::ports::{Cache, CacheError, CounterCache};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Use the in-memory adapters when Redis cannot be reached at startup.
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }
}

// Decrement that stops at zero. A missing or non-positive key is reset to 0.
const DECREMENT_FLOOR_LUA: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current <= 0 then
    redis.call('SET', KEYS[1], 0)
    return 0
end
return redis.call('DECR', KEYS[1])
"#;

/// Redis cache and counter store sharing one managed connection.
pub struct RedisCache {
    conn: ConnectionManager,
    decrement_floor: Script,
}

impl RedisCache {
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self {
            conn,
            decrement_floor: Script::new(DECREMENT_FLOOR_LUA),
        })
    }

    pub async fn from_env() -> Result<Self, CacheError> {
        Self::new(RedisConfig::from_env()).await
    }
}

fn op_err(e: redis::RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(duration) => conn
                .set_ex::<_, _, ()>(key, value, duration.as_secs().max(1))
                .await
                .map_err(op_err),
            None => conn.set::<_, _, ()>(key, value).await.map_err(op_err),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(op_err)
    }
}

#[async_trait]
impl CounterCache for RedisCache {
    async fn increment(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, i64>(key, 1).await.map_err(op_err)
    }

    async fn decrement_floor(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        self.decrement_floor
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(op_err)
    }

    async fn get(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(key).await.map_err(op_err)?;
        Ok(value.unwrap_or(0))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<i64>, CacheError> {
        match keys {
            [] => Ok(Vec::new()),
            // MGET with one key replies with a bare value, not an array.
            [key] => Ok(vec![CounterCache::get(self, key).await?]),
            _ => {
                let mut conn = self.conn.clone();
                let values: Vec<Option<i64>> = conn.mget(keys).await.map_err(op_err)?;
                Ok(values.into_iter().map(|v| v.unwrap_or(0)).collect())
            }
        }
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(op_err)
    }
}
