//! Follow graph endpoints.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use geofeed_shared::ApiResponse;
use geofeed_shared::dto::{FollowResponse, LimitQuery};

use crate::middleware::caller::Caller;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/v1/users/{id}/follow
pub async fn follow(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let changed = state
        .relationships
        .follow(caller.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FollowResponse {
        following: true,
        changed,
    })))
}

/// DELETE /api/v1/users/{id}/follow
pub async fn unfollow(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .relationships
        .unfollow(caller.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FollowResponse {
        following: false,
        changed: true,
    })))
}

/// GET /api/v1/users/{id}/followers
pub async fn followers(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let edges = state
        .relationships
        .followers(path.into_inner(), query.limit.unwrap_or(0))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(edges)))
}

/// GET /api/v1/users/{id}/following
pub async fn following(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let edges = state
        .relationships
        .following(path.into_inner(), query.limit.unwrap_or(0))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(edges)))
}

/// GET /api/v1/users/{id}/follow-counts
pub async fn follow_counts(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let counts = state.relationships.follow_counts(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(counts)))
}
