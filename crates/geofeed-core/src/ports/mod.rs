//! Ports - trait definitions for external dependencies.
//! Infrastructure adapters implement these; services only see the traits.

mod cache;
mod counter;
mod geocoder;
mod job_queue;
mod repository;

pub use cache::{Cache, CacheError};
pub use counter::CounterCache;
pub use geocoder::{AddressLookup, LookupError};
pub use job_queue::{
    Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats, job_handler,
};
pub use repository::{
    CommentRepository, FollowRepository, LikeRepository, LocationRepository, PostRepository,
};
