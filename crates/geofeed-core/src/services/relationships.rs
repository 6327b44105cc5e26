use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::{FollowCounts, FollowEdge};
use crate::error::DomainError;
use crate::pagination::{DEFAULT_LIMIT, MAX_LIMIT, effective_limit};
use crate::ports::FollowRepository;

/// Follow graph with advisory counters.
#[derive(Clone)]
pub struct RelationshipStore {
    repo: Arc<dyn FollowRepository>,
}

impl RelationshipStore {
    pub fn new(repo: Arc<dyn FollowRepository>) -> Self {
        Self { repo }
    }

    /// Returns `false` when the edge already existed. The conditional edge
    /// write decides, so concurrent callers see at most one `true`.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, DomainError> {
        if follower_id == following_id {
            return Err(DomainError::validation("users cannot follow themselves"));
        }
        if self.repo.find_edge(follower_id, following_id).await?.is_some() {
            return Ok(false);
        }

        let edge = FollowEdge {
            follower_id,
            following_id,
            created_at: Utc::now().trunc_subsecs(6),
        };
        if !self.repo.insert_edge(&edge).await? {
            return Ok(false);
        }
        self.adjust_counts(follower_id, following_id, 1).await;

        tracing::debug!(follower_id = %follower_id, following_id = %following_id, "Follow created");
        Ok(true)
    }

    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<(), DomainError> {
        let missing = || DomainError::not_found("follow", format!("{follower_id}->{following_id}"));

        if self.repo.find_edge(follower_id, following_id).await?.is_none() {
            return Err(missing());
        }
        if !self.repo.delete_edge(follower_id, following_id).await? {
            return Err(missing());
        }
        self.adjust_counts(follower_id, following_id, -1).await;

        tracing::debug!(follower_id = %follower_id, following_id = %following_id, "Follow removed");
        Ok(())
    }

    pub async fn is_following(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<bool, DomainError> {
        Ok(self.repo.find_edge(follower_id, following_id).await?.is_some())
    }

    pub async fn followers(&self, user_id: Uuid, limit: usize) -> Result<Vec<FollowEdge>, DomainError> {
        let limit = effective_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
        Ok(self.repo.list_followers(user_id, limit).await?)
    }

    pub async fn following(&self, user_id: Uuid, limit: usize) -> Result<Vec<FollowEdge>, DomainError> {
        let limit = effective_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
        Ok(self.repo.list_following(user_id, limit).await?)
    }

    pub async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts, DomainError> {
        Ok(self.repo.counts(user_id).await?.clamped())
    }

    async fn adjust_counts(&self, follower_id: Uuid, following_id: Uuid, delta: i64) {
        if let Err(e) = self.repo.adjust_counts(follower_id, following_id, delta).await {
            tracing::warn!(
                follower_id = %follower_id,
                following_id = %following_id,
                delta,
                error = %e,
                "Follow counters not updated"
            );
        }
    }
}
