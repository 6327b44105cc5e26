//! HTTP handlers and route configuration.

mod comments;
mod follows;
mod health;
mod likes;
mod locations;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health::health_check))
            // Posts
            .route("/posts", web::post().to(posts::create_post))
            .route("/posts/{id}", web::get().to(posts::get_post))
            .route("/feed", web::get().to(posts::nearby_feed))
            .route("/users/{id}/posts", web::get().to(posts::get_user_posts))
            // Likes
            .route("/posts/{id}/like", web::post().to(likes::like_post))
            .route("/posts/{id}/like", web::delete().to(likes::unlike_post))
            .route("/posts/{id}/likes", web::get().to(likes::post_likes))
            .route("/comments/{id}/like", web::post().to(likes::like_comment))
            .route("/comments/{id}/like", web::delete().to(likes::unlike_comment))
            .route("/likes/batch", web::post().to(likes::batch_likes))
            .route(
                "/admin/likes/{target_type}/{id}/sync",
                web::post().to(likes::sync_counter),
            )
            // Follows
            .route("/users/{id}/follow", web::post().to(follows::follow))
            .route("/users/{id}/follow", web::delete().to(follows::unfollow))
            .route("/users/{id}/followers", web::get().to(follows::followers))
            .route("/users/{id}/following", web::get().to(follows::following))
            .route("/users/{id}/follow-counts", web::get().to(follows::follow_counts))
            // Comments
            .route("/posts/{id}/comments", web::post().to(comments::create_comment))
            .route("/posts/{id}/comments", web::get().to(comments::list_comments))
            .route("/comments/{id}", web::delete().to(comments::delete_comment))
            // Locations
            .route("/locations", web::get().to(locations::location_label)),
    );
}
