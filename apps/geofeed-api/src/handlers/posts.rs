//! Post creation, lookup and the proximity feed.

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use serde::Serialize;
use uuid::Uuid;

use geofeed_core::domain::{ClientMeta, LocationLabel, NearbyPost, NearbyQuery, NewPost, Post};
use geofeed_core::{Cursor, Page};
use geofeed_shared::ApiResponse;
use geofeed_shared::dto::{CreatePostRequest, FeedQuery, PageQuery};

use crate::middleware::caller::{Caller, OptionalCaller};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// A feed entry with engagement and place information attached.
#[derive(Debug, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: NearbyPost,
    pub like_count: i64,
    pub is_liked: bool,
    pub location: Option<LocationLabel>,
}

/// A timeline entry with its place label attached.
#[derive(Debug, Serialize)]
pub struct TimelineItem {
    #[serde(flatten)]
    pub post: Post,
    pub location: Option<LocationLabel>,
}

fn client_meta(req: &HttpRequest) -> ClientMeta {
    ClientMeta {
        origin_address: req.connection_info().realip_remote_addr().map(str::to_string),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    caller: Caller,
    req: HttpRequest,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let post = state
        .posts
        .create_post(NewPost {
            author_id: caller.user_id,
            content: body.content,
            media_refs: body.media_refs,
            latitude: body.latitude,
            longitude: body.longitude,
            client_meta: client_meta(&req),
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state.posts.get_post_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// GET /api/v1/users/{id}/posts
pub async fn get_user_posts(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let cursor = Cursor::decode(query.cursor.as_deref().unwrap_or_default())?;
    let page: Page<Post> = state
        .posts
        .get_posts_by_user(path.into_inner(), query.limit.unwrap_or(0), cursor)
        .await?;
    let labels = state.locations.labels_for_posts(&page.items).await;

    let items = page
        .items
        .into_iter()
        .map(|post| {
            let location = labels.get(&post.cell_prefix).cloned();
            TimelineItem { post, location }
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Page {
        items,
        has_more: page.has_more,
        next_cursor: page.next_cursor,
    })))
}

/// GET /api/v1/feed
pub async fn nearby_feed(
    state: web::Data<AppState>,
    viewer: OptionalCaller,
    query: web::Query<FeedQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let nearby = NearbyQuery {
        latitude: query.latitude,
        longitude: query.longitude,
        radius_km: query.radius_km.unwrap_or(0.0),
        limit: query.limit.unwrap_or(0),
        cursor: Cursor::decode(query.cursor.as_deref().unwrap_or_default())?,
    };
    let page = state.posts.get_nearby_posts(&nearby).await?;

    let ids: Vec<Uuid> = page.items.iter().map(|n| n.post.id).collect();
    let posts: Vec<Post> = page.items.iter().map(|n| n.post.clone()).collect();
    let (likes, labels) = tokio::join!(
        state.engagement.get_likes_for_posts(&ids, viewer.user_id()),
        state.locations.labels_for_posts(&posts),
    );
    let likes = likes?;

    let items = page
        .items
        .into_iter()
        .map(|post| {
            let summary = likes.get(&post.post.id).copied().unwrap_or_default();
            let location = labels.get(&post.post.cell_prefix).cloned();
            FeedItem {
                post,
                like_count: summary.like_count,
                is_liked: summary.is_liked,
                location,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Page {
        items,
        has_more: page.has_more,
        next_cursor: page.next_cursor,
    })))
}
