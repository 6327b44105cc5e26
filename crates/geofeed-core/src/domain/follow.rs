use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed follow relationship, stored once per direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Advisory follower/following totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub user_id: Uuid,
    pub followers_count: i64,
    pub following_count: i64,
}

impl FollowCounts {
    /// Drifted counters can dip below zero after partial failures; readers never see that.
    pub fn clamped(self) -> Self {
        Self {
            followers_count: self.followers_count.max(0),
            following_count: self.following_count.max(0),
            ..self
        }
    }
}
