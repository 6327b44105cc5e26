//! Like toggles, counts and counter reconciliation.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use geofeed_core::domain::{LikeSummary, TargetRef, TargetType};
use geofeed_shared::ApiResponse;
use geofeed_shared::dto::BatchLikesRequest;

use crate::middleware::caller::{Caller, OptionalCaller};
use crate::middleware::error::AppResult;
use crate::state::AppState;

async fn toggle(
    state: &AppState,
    target: TargetRef,
    caller: Caller,
    want_liked: bool,
) -> AppResult<HttpResponse> {
    match target.target_type {
        TargetType::Post => {
            state.posts.get_post_by_id(target.target_id).await?;
        }
        TargetType::Comment => {
            state.comments.get_comment(target.target_id).await?;
        }
    }

    let result = state
        .engagement
        .toggle_like(target, caller.user_id, want_liked)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result)))
}

/// POST /api/v1/posts/{id}/like
pub async fn like_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    toggle(&state, TargetRef::post(path.into_inner()), caller, true).await
}

/// DELETE /api/v1/posts/{id}/like
pub async fn unlike_post(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    toggle(&state, TargetRef::post(path.into_inner()), caller, false).await
}

/// POST /api/v1/comments/{id}/like
pub async fn like_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    toggle(&state, TargetRef::comment(path.into_inner()), caller, true).await
}

/// DELETE /api/v1/comments/{id}/like
pub async fn unlike_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    toggle(&state, TargetRef::comment(path.into_inner()), caller, false).await
}

/// GET /api/v1/posts/{id}/likes
pub async fn post_likes(
    state: web::Data<AppState>,
    viewer: OptionalCaller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let target = TargetRef::post(path.into_inner());
    let like_count = state.engagement.get_like_count(target).await?;
    let is_liked = match viewer.user_id() {
        Some(user_id) => state.engagement.has_user_liked(target, user_id).await?,
        None => false,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeSummary {
        like_count,
        is_liked,
    })))
}

/// POST /api/v1/likes/batch
pub async fn batch_likes(
    state: web::Data<AppState>,
    viewer: OptionalCaller,
    body: web::Json<BatchLikesRequest>,
) -> AppResult<HttpResponse> {
    let summaries = state
        .engagement
        .get_likes_for_posts(&body.post_ids, viewer.user_id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(summaries)))
}

/// POST /api/v1/admin/likes/{target_type}/{id}/sync
pub async fn sync_counter(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(String, Uuid)>,
) -> AppResult<HttpResponse> {
    let (target_type, target_id) = path.into_inner();
    let target = TargetRef {
        target_type: target_type.parse()?,
        target_id,
    };

    let sync = state.engagement.sync_counter_from_durable_state(target).await?;
    tracing::info!(
        requested_by = %caller.user_id,
        target_type = %target.target_type,
        target_id = %target.target_id,
        durable_count = sync.durable_count,
        "Like counter reconciled"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::ok(sync)))
}
