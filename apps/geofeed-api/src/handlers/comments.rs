//! Comment threads.

use actix_web::{HttpResponse, web};
use serde::Serialize;
use uuid::Uuid;

use geofeed_core::domain::CommentNode;
use geofeed_shared::ApiResponse;
use geofeed_shared::dto::{CreateCommentRequest, LimitQuery};

use crate::middleware::caller::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CommentThreadResponse {
    pub comment_count: i64,
    pub comments: Vec<CommentNode>,
}

/// POST /api/v1/posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let comment = state
        .comments
        .create_comment(path.into_inner(), caller.user_id, body.content, body.parent_id)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(comment)))
}

/// GET /api/v1/posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let (comment_count, comments) = tokio::try_join!(
        state.comments.comment_count(post_id),
        state.comments.comment_thread(post_id, query.limit.unwrap_or(0)),
    )?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CommentThreadResponse {
        comment_count,
        comments,
    })))
}

/// DELETE /api/v1/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .comments
        .delete_comment(path.into_inner(), caller.user_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
