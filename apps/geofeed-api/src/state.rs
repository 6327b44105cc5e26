//! Application state - shared across all handlers.

use std::io;
use std::sync::Arc;

use geofeed_core::ports::{
    AddressLookup, Cache, CommentRepository, CounterCache, FollowRepository, JobQueue,
    LikeRepository, LocationRepository, PostRepository,
};
use geofeed_core::services::{
    CommentStore, EngagementStore, LocationStore, PostStore, RelationshipStore, audit_job_handler,
};
use geofeed_infra::{InMemoryCache, InMemoryJobQueue, InMemoryStore};

#[cfg(feature = "postgres")]
use geofeed_infra::{
    PostgresCommentRepository, PostgresFollowRepository, PostgresLikeRepository,
    PostgresLocationRepository, PostgresPostRepository,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostStore,
    pub engagement: EngagementStore,
    pub relationships: RelationshipStore,
    pub comments: CommentStore,
    pub locations: LocationStore,
    pub jobs: Arc<dyn JobQueue>,
}

/// Durable store adapters, one per port.
struct Repositories {
    posts: Arc<dyn PostRepository>,
    likes: Arc<dyn LikeRepository>,
    follows: Arc<dyn FollowRepository>,
    comments: Arc<dyn CommentRepository>,
    locations: Arc<dyn LocationRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            posts: store.clone(),
            likes: store.clone(),
            follows: store.clone(),
            comments: store.clone(),
            locations: store,
        }
    }

    async fn from_config(config: &AppConfig) -> Self {
        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Self::in_memory();
        };

        #[cfg(feature = "postgres")]
        {
            match db_config.connect().await {
                Ok(db) => {
                    tracing::info!("Connected to PostgreSQL");
                    Self {
                        posts: Arc::new(PostgresPostRepository::new(db.clone())),
                        likes: Arc::new(PostgresLikeRepository::new(db.clone())),
                        follows: Arc::new(PostgresFollowRepository::new(db.clone())),
                        comments: Arc::new(PostgresCommentRepository::new(db.clone())),
                        locations: Arc::new(PostgresLocationRepository::new(db)),
                    }
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to connect to database. Using in-memory fallback."
                    );
                    Self::in_memory()
                }
            }
        }

        #[cfg(not(feature = "postgres"))]
        {
            let _ = db_config;
            tracing::info!("Running without postgres feature - using in-memory store");
            Self::in_memory()
        }
    }
}

type Caches = (Arc<dyn Cache>, Arc<dyn CounterCache>);

fn memory_caches() -> Caches {
    let cache = Arc::new(InMemoryCache::new());
    (cache.clone(), cache)
}

#[cfg(feature = "redis")]
async fn caches(config: &AppConfig) -> io::Result<Caches> {
    use geofeed_infra::RedisCache;

    let Some(redis_config) = config.redis.clone() else {
        tracing::info!("REDIS_URL not set. Using in-memory counters");
        return Ok(memory_caches());
    };

    let fallback = redis_config.fallback_to_memory;
    match RedisCache::new(redis_config).await {
        Ok(redis) => {
            tracing::info!("Connected to Redis");
            let redis = Arc::new(redis);
            Ok((redis.clone(), redis))
        }
        Err(e) if fallback => {
            tracing::warn!(error = %e, "Redis unavailable. Using in-memory counters");
            Ok(memory_caches())
        }
        Err(e) => Err(io::Error::other(format!("redis: {e}"))),
    }
}

#[cfg(not(feature = "redis"))]
async fn caches(_config: &AppConfig) -> io::Result<Caches> {
    Ok(memory_caches())
}

#[cfg(feature = "geocoding")]
fn address_lookup(config: &AppConfig) -> Option<Arc<dyn AddressLookup>> {
    if !config.geocoder_enabled {
        return None;
    }

    match geofeed_infra::NominatimGeocoder::from_env() {
        Ok(geocoder) => Some(Arc::new(geocoder)),
        Err(e) => {
            tracing::warn!(error = %e, "Geocoder disabled");
            None
        }
    }
}

#[cfg(not(feature = "geocoding"))]
fn address_lookup(_config: &AppConfig) -> Option<Arc<dyn AddressLookup>> {
    None
}

impl AppState {
    /// Build the application state from configuration and start the audit worker.
    pub async fn new(config: &AppConfig) -> io::Result<Self> {
        let repos = Repositories::from_config(config).await;
        let (cache, counters) = caches(config).await?;
        let jobs: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new(config.jobs.clone()));
        let lookup = address_lookup(config);
        let geocoder = lookup.is_some();

        jobs.start_worker(audit_job_handler(repos.likes.clone(), config.audit_timeout))
            .await
            .map_err(|e| io::Error::other(e.to_string()))?;

        tracing::info!(geocoder, "Application state initialized");
        Ok(Self::assemble(repos, cache, counters, jobs, lookup))
    }

    /// Fully in-memory state with a running audit worker.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        Self::in_memory_with_lookup(None).await
    }

    #[cfg(test)]
    pub async fn in_memory_with_lookup(lookup: Option<Arc<dyn AddressLookup>>) -> Self {
        let repos = Repositories::in_memory();
        let (cache, counters) = memory_caches();
        let jobs: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::default());
        jobs.start_worker(audit_job_handler(
            repos.likes.clone(),
            geofeed_core::services::DEFAULT_AUDIT_TIMEOUT,
        ))
        .await
        .expect("worker starts");
        Self::assemble(repos, cache, counters, jobs, lookup)
    }

    fn assemble(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        counters: Arc<dyn CounterCache>,
        jobs: Arc<dyn JobQueue>,
        lookup: Option<Arc<dyn AddressLookup>>,
    ) -> Self {
        Self {
            posts: PostStore::new(repos.posts.clone()),
            engagement: EngagementStore::new(repos.likes, counters, jobs.clone()),
            relationships: RelationshipStore::new(repos.follows),
            comments: CommentStore::new(repos.comments, repos.posts),
            locations: LocationStore::new(cache, repos.locations, lookup),
            jobs,
        }
    }
}
