use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::spatial;

/// Maximum number of media references on a single post.
pub const MAX_MEDIA_REFS: usize = 4;

/// Post entity - a geotagged piece of content.
///
/// Every materialized view of a post carries exactly these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Time-ordered id (UUIDv7).
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media_refs: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Full-precision geohash, a stable location fingerprint.
    pub cell: String,
    /// Coarse geohash prefix, the partition key of the by-cell view.
    pub cell_prefix: String,
    pub created_at: DateTime<Utc>,
}

/// Request metadata captured at creation. Stored, never returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub origin_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub content: String,
    pub media_refs: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub client_meta: ClientMeta,
}

impl NewPost {
    /// Check coordinate ranges and media count.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DomainError::validation(
                "latitude must be between -90 and 90",
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DomainError::validation(
                "longitude must be between -180 and 180",
            ));
        }
        if self.media_refs.len() > MAX_MEDIA_REFS {
            return Err(DomainError::validation(format!(
                "at most {MAX_MEDIA_REFS} media references allowed"
            )));
        }
        Ok(())
    }
}

impl Post {
    /// Build a post from validated input, assigning id, cells and timestamp.
    ///
    /// `created_at` is truncated to microseconds so every backend stores it
    /// without loss and cursors built from it stay exact.
    pub fn create(input: &NewPost) -> Self {
        let cell = spatial::full_cell(input.latitude, input.longitude);
        let cell_prefix = cell[..spatial::CELL_PREFIX_PRECISION].to_string();

        Self {
            id: Uuid::now_v7(),
            author_id: input.author_id,
            content: input.content.clone(),
            media_refs: input.media_refs.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            cell,
            cell_prefix,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Great-circle distance from this post to a point.
    pub fn distance_to(&self, lat: f64, lng: f64) -> f64 {
        spatial::distance_km(lat, lng, self.latitude, self.longitude)
    }
}

/// The denormalized views a post is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostView {
    /// Canonical view keyed by post id.
    ById,
    /// Keyed by (cell prefix, created_at) for proximity feeds.
    ByCell,
    /// Keyed by (author, created_at) for profile timelines.
    ByAuthor,
}

impl PostView {
    /// Views written after the canonical row.
    pub const SECONDARY: [PostView; 2] = [PostView::ByCell, PostView::ByAuthor];
}

/// A post annotated with its distance from the query point.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPost {
    #[serde(flatten)]
    pub post: Post,
    pub distance_km: f64,
}

/// Proximity feed query.
#[derive(Debug, Clone, Default)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Non-positive values fall back to the default radius.
    pub radius_km: f64,
    /// Zero falls back to the default page size.
    pub limit: usize,
    pub cursor: crate::pagination::Cursor,
}
