use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Comment, CommentNode, MAX_COMMENT_DEPTH, MAX_COMMENT_LENGTH, build_thread};
use crate::error::DomainError;
use crate::pagination::{DEFAULT_LIMIT, MAX_LIMIT, effective_limit};
use crate::ports::{CommentRepository, PostRepository};

/// Threaded comments on posts.
#[derive(Clone)]
pub struct CommentStore {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentStore {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    /// Add a comment, or a reply when `parent_id` is given.
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
        parent_id: Option<Uuid>,
    ) -> Result<Comment, DomainError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(DomainError::validation("comment content is required"));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(DomainError::validation(format!(
                "comment exceeds {MAX_COMMENT_LENGTH} characters"
            )));
        }

        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::not_found("post", post_id));
        }

        let parent = match parent_id {
            Some(id) => {
                let parent = self
                    .comments
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("comment", id))?;
                if parent.post_id != post_id {
                    return Err(DomainError::validation(
                        "parent comment belongs to another post",
                    ));
                }
                if parent.depth >= MAX_COMMENT_DEPTH {
                    return Err(DomainError::validation(format!(
                        "replies are limited to {MAX_COMMENT_DEPTH} levels"
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        let comment = Comment::new(post_id, parent.as_ref(), author_id, content);
        self.comments.insert(&comment).await?;

        if let Err(e) = self.comments.adjust_count(post_id, 1).await {
            tracing::warn!(post_id = %post_id, error = %e, "Comment counter not incremented");
        }

        tracing::debug!(comment_id = %comment.id, post_id = %post_id, depth = comment.depth, "Comment created");
        Ok(comment)
    }

    pub async fn get_comment(&self, id: Uuid) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", id))
    }

    /// Only the author may delete. Replies are left in place and surface as
    /// roots in later thread reads.
    pub async fn delete_comment(&self, id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        let comment = self.get_comment(id).await?;
        if comment.author_id != user_id {
            return Err(DomainError::Forbidden(
                "only the author can delete a comment".into(),
            ));
        }

        self.comments.delete(&comment).await?;
        if let Err(e) = self.comments.adjust_count(comment.post_id, -1).await {
            tracing::warn!(post_id = %comment.post_id, error = %e, "Comment counter not decremented");
        }
        Ok(())
    }

    pub async fn comment_count(&self, post_id: Uuid) -> Result<i64, DomainError> {
        Ok(self.comments.count(post_id).await?.max(0))
    }

    /// The first `limit` comments of a post assembled into reply trees.
    pub async fn comment_thread(
        &self,
        post_id: Uuid,
        limit: usize,
    ) -> Result<Vec<CommentNode>, DomainError> {
        let limit = effective_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
        let rows = self.comments.list_for_post(post_id, limit).await?;
        Ok(build_thread(rows))
    }
}
