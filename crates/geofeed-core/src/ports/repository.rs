//! Durable store ports.
//!
//! The backing store is partition-oriented: point reads, time-ordered scans
//! within one partition, single-row conditional writes and best-effort
//! batches. Nothing here spans partitions atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ClientMeta, Comment, FollowCounts, FollowEdge, LikeAuditEvent, LikeState, LocationLabel, Post,
    PostView, TargetRef,
};
use crate::error::RepoError;

/// Denormalized post views.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Upsert `post` into each of `views` as one batch. Writes are keyed by
    /// post id so resubmitting them is harmless. `meta` is persisted with the
    /// canonical view only.
    async fn insert_views(
        &self,
        post: &Post,
        meta: &ClientMeta,
        views: &[PostView],
    ) -> Result<(), RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    /// Newest-first scan of one cell partition, restricted to rows strictly
    /// older than `before` when given.
    async fn scan_by_cell(
        &self,
        cell_prefix: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError>;

    /// Newest-first scan of one author's posts, same bound semantics as
    /// [`PostRepository::scan_by_cell`].
    async fn scan_by_author(
        &self,
        author_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError>;
}

/// Like rows plus the secondary audit record.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert only if no row exists for (target, user). Returns whether it applied.
    async fn insert_if_absent(&self, like: &LikeState) -> Result<bool, RepoError>;

    async fn exists(&self, target: &TargetRef, user_id: Uuid) -> Result<bool, RepoError>;

    /// Delete only if the row exists. Returns whether it applied.
    async fn delete_if_present(&self, target: &TargetRef, user_id: Uuid)
    -> Result<bool, RepoError>;

    /// Number of like rows for the target.
    async fn count_for_target(&self, target: &TargetRef) -> Result<i64, RepoError>;

    /// Apply a transition to the audit record.
    async fn record_audit(&self, event: &LikeAuditEvent) -> Result<(), RepoError>;
}

/// Follow edges stored in both directions, plus advisory counters.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Write the forward and reverse edge as one batch, only if the forward
    /// edge is absent. Returns whether the write applied.
    async fn insert_edge(&self, edge: &FollowEdge) -> Result<bool, RepoError>;

    async fn find_edge(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>, RepoError>;

    /// Remove both directions as one batch. Returns whether the forward edge
    /// was present.
    async fn delete_edge(&self, follower_id: Uuid, following_id: Uuid)
    -> Result<bool, RepoError>;

    /// Edges pointing at `user_id`, newest first.
    async fn list_followers(&self, user_id: Uuid, limit: usize)
    -> Result<Vec<FollowEdge>, RepoError>;

    /// Edges leaving `user_id`, newest first.
    async fn list_following(&self, user_id: Uuid, limit: usize)
    -> Result<Vec<FollowEdge>, RepoError>;

    /// Add `delta` to the follower's following count and to the followed
    /// user's followers count.
    async fn adjust_counts(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        delta: i64,
    ) -> Result<(), RepoError>;

    /// Raw counters; zero for unknown users.
    async fn counts(&self, user_id: Uuid) -> Result<FollowCounts, RepoError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: &Comment) -> Result<(), RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError>;

    /// Oldest-first comments of one post.
    async fn list_for_post(&self, post_id: Uuid, limit: usize) -> Result<Vec<Comment>, RepoError>;

    async fn delete(&self, comment: &Comment) -> Result<(), RepoError>;

    async fn adjust_count(&self, post_id: Uuid, delta: i64) -> Result<(), RepoError>;

    async fn count(&self, post_id: Uuid) -> Result<i64, RepoError>;
}

/// Resolved labels keyed by coarse cell prefix.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn get(&self, cell_prefix: &str) -> Result<Option<LocationLabel>, RepoError>;

    async fn save(&self, label: &LocationLabel) -> Result<(), RepoError>;
}
