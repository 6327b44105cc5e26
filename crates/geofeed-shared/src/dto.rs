//! Data Transfer Objects - request bodies and query strings for the API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /posts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub media_refs: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Query of `GET /feed`. Omitted radius and limit fall back to server defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

/// Cursor pagination for time-ordered listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Body of `POST /likes/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLikesRequest {
    pub post_ids: Vec<Uuid>,
}

/// Body of `POST /posts/{id}/comments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of a follow or unfollow call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
    /// False when the request matched the existing state.
    pub changed: bool,
}
