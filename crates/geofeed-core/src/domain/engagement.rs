use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Kinds of content that can be liked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(TargetType::Post),
            "comment" => Ok(TargetType::Comment),
            other => Err(DomainError::validation(format!(
                "unknown target type: {other}"
            ))),
        }
    }
}

/// A likeable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: Uuid,
}

impl TargetRef {
    pub fn post(id: Uuid) -> Self {
        Self {
            target_type: TargetType::Post,
            target_id: id,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            target_type: TargetType::Comment,
            target_id: id,
        }
    }

    /// Key of this target's like counter in the counter cache.
    pub fn counter_key(&self) -> String {
        format!("like_count:{}:{}", self.target_type, self.target_id)
    }
}

/// One user's like on one target. Its existence is the "liked" state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub target: TargetRef,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a like/unlike request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleLikeResult {
    pub is_liked: bool,
    pub like_count: i64,
    /// Whether this call performed the transition.
    pub changed: bool,
}

/// Like information for one target as seen by one (optional) viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeSummary {
    pub like_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Liked,
    Unliked,
}

/// A state transition replicated to the secondary audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeAuditEvent {
    pub action: AuditAction,
    pub target: TargetRef,
    pub user_id: Uuid,
    pub at: DateTime<Utc>,
}

/// Result of reconciling a counter with the durable like rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSync {
    pub durable_count: i64,
    pub cache_updated: bool,
}
