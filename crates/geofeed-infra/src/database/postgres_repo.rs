//! PostgreSQL repository implementations.
//!
//! Tables mirror a partition/clustering layout: each view has its own
//! composite primary key and every scan is a single-partition range read.
//! Conditional writes use `ON CONFLICT DO NOTHING` and row counts; counters
//! use single-statement upserts so concurrent adjustments commute.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, DbConn, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use geofeed_core::domain::{
    Address, AuditAction, ClientMeta, Comment, FollowCounts, FollowEdge, LikeAuditEvent,
    LikeState, LocationLabel, Post, PostView, TargetRef,
};
use geofeed_core::error::RepoError;
use geofeed_core::ports::{
    CommentRepository, FollowRepository, LikeRepository, LocationRepository, PostRepository,
};

use super::entity::{
    comment_counts, comments, follow_counts, followers, follows, like_audit, like_state,
    location_names, posts_by_author, posts_by_cell, posts_by_id,
};

fn db_err(e: DbErr) -> RepoError {
    match e {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => RepoError::Connection(e.to_string()),
        other => RepoError::Query(other.to_string()),
    }
}

/// PostgreSQL post views.
#[derive(Clone)]
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn insert_views(
        &self,
        post: &Post,
        meta: &ClientMeta,
        views: &[PostView],
    ) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        for view in views {
            match view {
                PostView::ById => {
                    posts_by_id::Entity::insert(posts_by_id::ActiveModel::from_post(post, meta))
                        .on_conflict(
                            OnConflict::column(posts_by_id::Column::PostId)
                                .do_nothing()
                                .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await
                        .map_err(db_err)?;
                }
                PostView::ByCell => {
                    posts_by_cell::Entity::insert(posts_by_cell::ActiveModel::from(post))
                        .on_conflict(
                            OnConflict::columns([
                                posts_by_cell::Column::CellPrefix,
                                posts_by_cell::Column::CreatedAt,
                                posts_by_cell::Column::PostId,
                            ])
                            .do_nothing()
                            .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await
                        .map_err(db_err)?;
                }
                PostView::ByAuthor => {
                    posts_by_author::Entity::insert(posts_by_author::ActiveModel::from(post))
                        .on_conflict(
                            OnConflict::columns([
                                posts_by_author::Column::AuthorId,
                                posts_by_author::Column::CreatedAt,
                                posts_by_author::Column::PostId,
                            ])
                            .do_nothing()
                            .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await
                        .map_err(db_err)?;
                }
            }
        }

        txn.commit().await.map_err(db_err)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let row = posts_by_id::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn scan_by_cell(
        &self,
        cell_prefix: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        let rows = posts_by_cell::Entity::find()
            .filter(posts_by_cell::Column::CellPrefix.eq(cell_prefix))
            .apply_if(before, |q, bound| {
                q.filter(posts_by_cell::Column::CreatedAt.lt(bound))
            })
            .order_by_desc(posts_by_cell::Column::CreatedAt)
            .order_by_desc(posts_by_cell::Column::PostId)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn scan_by_author(
        &self,
        author_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        let rows = posts_by_author::Entity::find()
            .filter(posts_by_author::Column::AuthorId.eq(author_id))
            .apply_if(before, |q, bound| {
                q.filter(posts_by_author::Column::CreatedAt.lt(bound))
            })
            .order_by_desc(posts_by_author::Column::CreatedAt)
            .order_by_desc(posts_by_author::Column::PostId)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// PostgreSQL like state and audit record.
#[derive(Clone)]
pub struct PostgresLikeRepository {
    db: DbConn,
}

impl PostgresLikeRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn like_key(target: &TargetRef, user_id: Uuid) -> (String, Uuid, Uuid) {
    (target.target_type.to_string(), target.target_id, user_id)
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn insert_if_absent(&self, like: &LikeState) -> Result<bool, RepoError> {
        let row = like_state::ActiveModel {
            target_type: Set(like.target.target_type.to_string()),
            target_id: Set(like.target.target_id),
            user_id: Set(like.user_id),
            created_at: Set(like.created_at.into()),
        };

        let inserted = like_state::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    like_state::Column::TargetType,
                    like_state::Column::TargetId,
                    like_state::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        Ok(inserted == 1)
    }

    async fn exists(&self, target: &TargetRef, user_id: Uuid) -> Result<bool, RepoError> {
        let row = like_state::Entity::find_by_id(like_key(target, user_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn delete_if_present(
        &self,
        target: &TargetRef,
        user_id: Uuid,
    ) -> Result<bool, RepoError> {
        let result = like_state::Entity::delete_by_id(like_key(target, user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn count_for_target(&self, target: &TargetRef) -> Result<i64, RepoError> {
        let count = like_state::Entity::find()
            .filter(like_state::Column::TargetType.eq(target.target_type.as_str()))
            .filter(like_state::Column::TargetId.eq(target.target_id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn record_audit(&self, event: &LikeAuditEvent) -> Result<(), RepoError> {
        match event.action {
            AuditAction::Liked => {
                let row = like_audit::ActiveModel {
                    target_type: Set(event.target.target_type.to_string()),
                    target_id: Set(event.target.target_id),
                    user_id: Set(event.user_id),
                    created_at: Set(event.at.into()),
                };
                like_audit::Entity::insert(row)
                    .on_conflict(
                        OnConflict::columns([
                            like_audit::Column::TargetType,
                            like_audit::Column::TargetId,
                            like_audit::Column::UserId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(&self.db)
                    .await
                    .map_err(db_err)?;
            }
            AuditAction::Unliked => {
                like_audit::Entity::delete_by_id(like_key(&event.target, event.user_id))
                    .exec(&self.db)
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }
}

/// PostgreSQL follow graph.
#[derive(Clone)]
pub struct PostgresFollowRepository {
    db: DbConn,
}

impl PostgresFollowRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

const ADJUST_FOLLOWERS_SQL: &str = r#"
INSERT INTO follow_counts (user_id, followers_count, following_count)
VALUES ($1, $2, 0)
ON CONFLICT (user_id)
DO UPDATE SET followers_count = follow_counts.followers_count + EXCLUDED.followers_count
"#;

const ADJUST_FOLLOWING_SQL: &str = r#"
INSERT INTO follow_counts (user_id, followers_count, following_count)
VALUES ($1, 0, $2)
ON CONFLICT (user_id)
DO UPDATE SET following_count = follow_counts.following_count + EXCLUDED.following_count
"#;

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn insert_edge(&self, edge: &FollowEdge) -> Result<bool, RepoError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let inserted = follows::Entity::insert(follows::ActiveModel {
            follower_id: Set(edge.follower_id),
            following_id: Set(edge.following_id),
            created_at: Set(edge.created_at.into()),
        })
        .on_conflict(
            OnConflict::columns([follows::Column::FollowerId, follows::Column::FollowingId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map_err(db_err)?;
        if inserted != 1 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        followers::Entity::insert(followers::ActiveModel {
            user_id: Set(edge.following_id),
            follower_id: Set(edge.follower_id),
            created_at: Set(edge.created_at.into()),
        })
        .on_conflict(
            OnConflict::columns([followers::Column::UserId, followers::Column::FollowerId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn find_edge(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>, RepoError> {
        let row = follows::Entity::find_by_id((follower_id, following_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let removed = follows::Entity::delete_by_id((follower_id, following_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if removed.rows_affected != 1 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }
        followers::Entity::delete_by_id((following_id, follower_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FollowEdge>, RepoError> {
        let rows = followers::Entity::find()
            .filter(followers::Column::UserId.eq(user_id))
            .order_by_desc(followers::Column::CreatedAt)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FollowEdge>, RepoError> {
        let rows = follows::Entity::find()
            .filter(follows::Column::FollowerId.eq(user_id))
            .order_by_desc(follows::Column::CreatedAt)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn adjust_counts(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        delta: i64,
    ) -> Result<(), RepoError> {
        self.db
            .execute_raw(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ADJUST_FOLLOWING_SQL,
                [follower_id.into(), delta.into()],
            ))
            .await
            .map_err(db_err)?;
        self.db
            .execute_raw(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ADJUST_FOLLOWERS_SQL,
                [following_id.into(), delta.into()],
            ))
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn counts(&self, user_id: Uuid) -> Result<FollowCounts, RepoError> {
        let row = follow_counts::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map_or(
            FollowCounts {
                user_id,
                ..FollowCounts::default()
            },
            |r| FollowCounts {
                user_id,
                followers_count: r.followers_count,
                following_count: r.following_count,
            },
        ))
    }
}

/// PostgreSQL comments and per-post comment counters.
#[derive(Clone)]
pub struct PostgresCommentRepository {
    db: DbConn,
}

impl PostgresCommentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

const ADJUST_COMMENT_COUNT_SQL: &str = r#"
INSERT INTO comment_counts (post_id, comment_count)
VALUES ($1, $2)
ON CONFLICT (post_id)
DO UPDATE SET comment_count = comment_counts.comment_count + EXCLUDED.comment_count
"#;

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn insert(&self, comment: &Comment) -> Result<(), RepoError> {
        comments::Entity::insert(comments::ActiveModel::from(comment))
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let row = comments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_for_post(&self, post_id: Uuid, limit: usize) -> Result<Vec<Comment>, RepoError> {
        let rows = comments::Entity::find()
            .filter(comments::Column::PostId.eq(post_id))
            .order_by_asc(comments::Column::CreatedAt)
            .order_by_asc(comments::Column::CommentId)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, comment: &Comment) -> Result<(), RepoError> {
        comments::Entity::delete_by_id(comment.id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn adjust_count(&self, post_id: Uuid, delta: i64) -> Result<(), RepoError> {
        self.db
            .execute_raw(Statement::from_sql_and_values(
                DbBackend::Postgres,
                ADJUST_COMMENT_COUNT_SQL,
                [post_id.into(), delta.into()],
            ))
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn count(&self, post_id: Uuid) -> Result<i64, RepoError> {
        let row = comment_counts::Entity::find_by_id(post_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map_or(0, |r| r.comment_count))
    }
}

/// PostgreSQL location labels.
#[derive(Clone)]
pub struct PostgresLocationRepository {
    db: DbConn,
}

impl PostgresLocationRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocationRepository for PostgresLocationRepository {
    async fn get(&self, cell_prefix: &str) -> Result<Option<LocationLabel>, RepoError> {
        let Some(row) = location_names::Entity::find_by_id(cell_prefix.to_owned())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let address: Address = serde_json::from_value(row.address)
            .map_err(|e| RepoError::Query(format!("malformed address: {e}")))?;

        Ok(Some(LocationLabel {
            cell_prefix: row.cell_prefix,
            display_name: row.display_name,
            name: row.name,
            address,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at.into(),
        }))
    }

    async fn save(&self, label: &LocationLabel) -> Result<(), RepoError> {
        let address = serde_json::to_value(&label.address)
            .map_err(|e| RepoError::Query(format!("unserializable address: {e}")))?;

        let row = location_names::ActiveModel {
            cell_prefix: Set(label.cell_prefix.clone()),
            display_name: Set(label.display_name.clone()),
            name: Set(label.name.clone()),
            address: Set(address),
            latitude: Set(label.latitude),
            longitude: Set(label.longitude),
            created_at: Set(label.created_at.into()),
        };

        location_names::Entity::insert(row)
            .on_conflict(
                OnConflict::column(location_names::Column::CellPrefix)
                    .update_columns([
                        location_names::Column::DisplayName,
                        location_names::Column::Name,
                        location_names::Column::Address,
                        location_names::Column::Latitude,
                        location_names::Column::Longitude,
                        location_names::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
