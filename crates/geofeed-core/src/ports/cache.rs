use async_trait::async_trait;
use std::time::Duration;

/// Cache trait - string key/value store with TTLs, used for hot lookups
/// such as resolved location labels.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value; misses and backend failures both read as `None`.
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
