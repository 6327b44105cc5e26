//! # Geofeed Infrastructure
//!
//! Concrete implementations of the ports defined in `geofeed-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `redis` - Redis cache and like counters
//! - `geocoding` - Nominatim reverse geocoding

pub mod cache;
pub mod database;
pub mod jobs;
pub mod store;

#[cfg(feature = "geocoding")]
pub mod geocoding;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::DatabaseConfig;
pub use jobs::{InMemoryJobQueue, InMemoryJobQueueConfig};
pub use store::InMemoryStore;

// Re-exports - External services
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(feature = "postgres")]
pub use database::{
    PostgresCommentRepository, PostgresFollowRepository, PostgresLikeRepository,
    PostgresLocationRepository, PostgresPostRepository,
};
#[cfg(feature = "geocoding")]
pub use geocoding::{NominatimConfig, NominatimGeocoder};
