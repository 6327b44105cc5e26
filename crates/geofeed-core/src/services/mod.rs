//! Application services composed from ports.

mod comments;
mod engagement;
mod locations;
mod posts;
mod relationships;

pub use comments::CommentStore;
pub use engagement::{AUDIT_JOB_TYPE, DEFAULT_AUDIT_TIMEOUT, EngagementStore, audit_job_handler};
pub use locations::{LABEL_CACHE_TTL, LocationStore};
pub use posts::{DEFAULT_RADIUS_KM, PostStore};
pub use relationships::RelationshipStore;
