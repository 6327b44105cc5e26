use async_trait::async_trait;

use super::CacheError;

/// Atomic integer counters keyed by string.
///
/// Implementations must allow concurrent increments and decrements on the
/// same key without external locking. Every method may fail with
/// [`CacheError`]; callers treat the durable store as the source of truth
/// and recover from those failures themselves.
#[async_trait]
pub trait CounterCache: Send + Sync {
    /// Add one and return the new value. Missing keys start at zero.
    async fn increment(&self, key: &str) -> Result<i64, CacheError>;

    /// Subtract one unless the value is already zero or below; return the
    /// resulting value, which is never negative.
    async fn decrement_floor(&self, key: &str) -> Result<i64, CacheError>;

    /// Current value; missing keys read as zero.
    async fn get(&self, key: &str) -> Result<i64, CacheError>;

    /// Values for `keys`, in order, with missing keys read as zero.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<i64>, CacheError>;

    /// Overwrite the value.
    async fn set(&self, key: &str, value: i64) -> Result<(), CacheError>;
}
