use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use geofeed_core::domain::{
    AuditAction, ClientMeta, Comment, FollowCounts, FollowEdge, LikeAuditEvent, LikeState,
    LocationLabel, Post, PostView, TargetRef,
};
use geofeed_core::error::RepoError;
use geofeed_core::ports::{
    CommentRepository, FollowRepository, LikeRepository, LocationRepository, PostRepository,
};

/// Rows of a time-clustered partition, ordered by (created_at, id).
type Timeline<T> = BTreeMap<(DateTime<Utc>, Uuid), T>;

#[derive(Default)]
struct PostTables {
    by_id: HashMap<Uuid, (Post, ClientMeta)>,
    by_cell: HashMap<String, Timeline<Post>>,
    by_author: HashMap<Uuid, Timeline<Post>>,
}

#[derive(Default)]
struct LikeTables {
    state: HashMap<TargetRef, HashMap<Uuid, LikeState>>,
    audit: HashMap<TargetRef, HashMap<Uuid, DateTime<Utc>>>,
}

#[derive(Default)]
struct FollowTables {
    /// follower -> followed -> edge
    outgoing: HashMap<Uuid, HashMap<Uuid, FollowEdge>>,
    /// followed -> follower -> edge
    incoming: HashMap<Uuid, HashMap<Uuid, FollowEdge>>,
    /// user -> (followers, following)
    counts: HashMap<Uuid, (i64, i64)>,
}

#[derive(Default)]
struct CommentTables {
    by_id: HashMap<Uuid, Comment>,
    by_post: HashMap<Uuid, Timeline<Uuid>>,
    counts: HashMap<Uuid, i64>,
}

/// All repository ports over in-memory tables.
///
/// Each table group sits behind its own async `RwLock`. Conditional writes
/// check and mutate under one write guard, which gives the same single-row
/// compare-and-set behavior a real store offers. Data is lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    posts: RwLock<PostTables>,
    likes: RwLock<LikeTables>,
    follows: RwLock<FollowTables>,
    comments: RwLock<CommentTables>,
    locations: RwLock<HashMap<String, LocationLabel>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users recorded in the audit table for `target`.
    #[cfg(test)]
    pub(crate) async fn audited_users(&self, target: &TargetRef) -> Vec<Uuid> {
        self.likes
            .read()
            .await
            .audit
            .get(target)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Drop one view row, simulating a partially applied fan-out.
    #[cfg(test)]
    pub(crate) async fn remove_view(&self, post: &Post, view: PostView) {
        let mut tables = self.posts.write().await;
        let key = (post.created_at, post.id);
        match view {
            PostView::ById => {
                tables.by_id.remove(&post.id);
            }
            PostView::ByCell => {
                if let Some(rows) = tables.by_cell.get_mut(&post.cell_prefix) {
                    rows.remove(&key);
                }
            }
            PostView::ByAuthor => {
                if let Some(rows) = tables.by_author.get_mut(&post.author_id) {
                    rows.remove(&key);
                }
            }
        }
    }
}

/// Newest-first rows strictly older than `before`.
fn scan_newest<T: Clone>(
    rows: Option<&Timeline<T>>,
    before: Option<DateTime<Utc>>,
    limit: usize,
) -> Vec<T> {
    let Some(rows) = rows else {
        return Vec::new();
    };
    // Uuid::nil() is the smallest id, so this excludes every row at `bound`.
    let upper = before.map_or(Bound::Unbounded, |bound| Bound::Excluded((bound, Uuid::nil())));
    rows.range((Bound::Unbounded, upper))
        .rev()
        .take(limit)
        .map(|(_, row)| row.clone())
        .collect()
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn insert_views(
        &self,
        post: &Post,
        meta: &ClientMeta,
        views: &[PostView],
    ) -> Result<(), RepoError> {
        let mut tables = self.posts.write().await;
        let key = (post.created_at, post.id);
        for view in views {
            match view {
                PostView::ById => {
                    tables.by_id.insert(post.id, (post.clone(), meta.clone()));
                }
                PostView::ByCell => {
                    tables
                        .by_cell
                        .entry(post.cell_prefix.clone())
                        .or_default()
                        .insert(key, post.clone());
                }
                PostView::ByAuthor => {
                    tables
                        .by_author
                        .entry(post.author_id)
                        .or_default()
                        .insert(key, post.clone());
                }
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.posts.read().await.by_id.get(&id).map(|(p, _)| p.clone()))
    }

    async fn scan_by_cell(
        &self,
        cell_prefix: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.posts.read().await;
        Ok(scan_newest(tables.by_cell.get(cell_prefix), before, limit))
    }

    async fn scan_by_author(
        &self,
        author_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.posts.read().await;
        Ok(scan_newest(tables.by_author.get(&author_id), before, limit))
    }
}

#[async_trait]
impl LikeRepository for InMemoryStore {
    async fn insert_if_absent(&self, like: &LikeState) -> Result<bool, RepoError> {
        let mut tables = self.likes.write().await;
        let rows = tables.state.entry(like.target).or_default();
        if rows.contains_key(&like.user_id) {
            return Ok(false);
        }
        rows.insert(like.user_id, like.clone());
        Ok(true)
    }

    async fn exists(&self, target: &TargetRef, user_id: Uuid) -> Result<bool, RepoError> {
        Ok(self
            .likes
            .read()
            .await
            .state
            .get(target)
            .is_some_and(|rows| rows.contains_key(&user_id)))
    }

    async fn delete_if_present(
        &self,
        target: &TargetRef,
        user_id: Uuid,
    ) -> Result<bool, RepoError> {
        let mut tables = self.likes.write().await;
        Ok(tables
            .state
            .get_mut(target)
            .and_then(|rows| rows.remove(&user_id))
            .is_some())
    }

    async fn count_for_target(&self, target: &TargetRef) -> Result<i64, RepoError> {
        Ok(self
            .likes
            .read()
            .await
            .state
            .get(target)
            .map_or(0, |rows| rows.len() as i64))
    }

    async fn record_audit(&self, event: &LikeAuditEvent) -> Result<(), RepoError> {
        let mut tables = self.likes.write().await;
        let rows = tables.audit.entry(event.target).or_default();
        match event.action {
            AuditAction::Liked => {
                rows.insert(event.user_id, event.at);
            }
            AuditAction::Unliked => {
                rows.remove(&event.user_id);
            }
        }
        Ok(())
    }
}

fn newest_edges(rows: Option<&HashMap<Uuid, FollowEdge>>, limit: usize) -> Vec<FollowEdge> {
    let mut edges: Vec<FollowEdge> = rows.map(|r| r.values().cloned().collect()).unwrap_or_default();
    edges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    edges.truncate(limit);
    edges
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn insert_edge(&self, edge: &FollowEdge) -> Result<bool, RepoError> {
        let mut tables = self.follows.write().await;
        let outgoing = tables.outgoing.entry(edge.follower_id).or_default();
        if outgoing.contains_key(&edge.following_id) {
            return Ok(false);
        }
        outgoing.insert(edge.following_id, edge.clone());
        tables
            .incoming
            .entry(edge.following_id)
            .or_default()
            .insert(edge.follower_id, edge.clone());
        Ok(true)
    }

    async fn find_edge(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>, RepoError> {
        Ok(self
            .follows
            .read()
            .await
            .outgoing
            .get(&follower_id)
            .and_then(|rows| rows.get(&following_id))
            .cloned())
    }

    async fn delete_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.follows.write().await;
        let removed = tables
            .outgoing
            .get_mut(&follower_id)
            .and_then(|rows| rows.remove(&following_id))
            .is_some();
        if let Some(rows) = tables.incoming.get_mut(&following_id) {
            rows.remove(&follower_id);
        }
        Ok(removed)
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FollowEdge>, RepoError> {
        Ok(newest_edges(self.follows.read().await.incoming.get(&user_id), limit))
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FollowEdge>, RepoError> {
        Ok(newest_edges(self.follows.read().await.outgoing.get(&user_id), limit))
    }

    async fn adjust_counts(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        delta: i64,
    ) -> Result<(), RepoError> {
        let mut tables = self.follows.write().await;
        tables.counts.entry(follower_id).or_default().1 += delta;
        tables.counts.entry(following_id).or_default().0 += delta;
        Ok(())
    }

    async fn counts(&self, user_id: Uuid) -> Result<FollowCounts, RepoError> {
        let (followers_count, following_count) = self
            .follows
            .read()
            .await
            .counts
            .get(&user_id)
            .copied()
            .unwrap_or_default();
        Ok(FollowCounts {
            user_id,
            followers_count,
            following_count,
        })
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn insert(&self, comment: &Comment) -> Result<(), RepoError> {
        let mut tables = self.comments.write().await;
        tables
            .by_post
            .entry(comment.post_id)
            .or_default()
            .insert((comment.created_at, comment.id), comment.id);
        tables.by_id.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.comments.read().await.by_id.get(&id).cloned())
    }

    async fn list_for_post(&self, post_id: Uuid, limit: usize) -> Result<Vec<Comment>, RepoError> {
        let tables = self.comments.read().await;
        let Some(ids) = tables.by_post.get(&post_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .values()
            .filter_map(|id| tables.by_id.get(id).cloned())
            .take(limit)
            .collect())
    }

    async fn delete(&self, comment: &Comment) -> Result<(), RepoError> {
        let mut tables = self.comments.write().await;
        tables.by_id.remove(&comment.id);
        if let Some(ids) = tables.by_post.get_mut(&comment.post_id) {
            ids.remove(&(comment.created_at, comment.id));
        }
        Ok(())
    }

    async fn adjust_count(&self, post_id: Uuid, delta: i64) -> Result<(), RepoError> {
        *self.comments.write().await.counts.entry(post_id).or_default() += delta;
        Ok(())
    }

    async fn count(&self, post_id: Uuid) -> Result<i64, RepoError> {
        Ok(self
            .comments
            .read()
            .await
            .counts
            .get(&post_id)
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl LocationRepository for InMemoryStore {
    async fn get(&self, cell_prefix: &str) -> Result<Option<LocationLabel>, RepoError> {
        Ok(self.locations.read().await.get(cell_prefix).cloned())
    }

    async fn save(&self, label: &LocationLabel) -> Result<(), RepoError> {
        self.locations
            .write()
            .await
            .insert(label.cell_prefix.clone(), label.clone());
        Ok(())
    }
}
