use std::sync::Arc;

use futures::future::try_join_all;
use uuid::Uuid;

use crate::domain::{ClientMeta, NearbyPost, NearbyQuery, NewPost, Post, PostView};
use crate::error::DomainError;
use crate::pagination::{Cursor, DEFAULT_LIMIT, MAX_LIMIT, Page, effective_limit};
use crate::ports::PostRepository;
use crate::spatial;

/// Search radius used when the caller gives none.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Geotagged post storage over three denormalized views.
///
/// Writes follow a two-step saga: the canonical by-id row first, then the
/// by-cell and by-author rows as one batch. A failure in the second step
/// leaves the canonical row in place; [`PostStore::repair_views`] replays
/// the fan-out from it.
#[derive(Clone)]
pub struct PostStore {
    repo: Arc<dyn PostRepository>,
}

impl PostStore {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        input.validate()?;
        let post = Post::create(&input);

        self.repo
            .insert_views(&post, &input.client_meta, &[PostView::ById])
            .await
            .inspect_err(|e| {
                tracing::error!(post_id = %post.id, error = %e, "Failed to write canonical post view");
            })?;

        self.repo
            .insert_views(&post, &input.client_meta, &PostView::SECONDARY)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    post_id = %post.id,
                    error = %e,
                    "Secondary post views not written, canonical row needs repair"
                );
            })?;

        tracing::debug!(
            post_id = %post.id,
            author_id = %post.author_id,
            cell_prefix = %post.cell_prefix,
            "Post created"
        );
        Ok(post)
    }

    pub async fn get_post_by_id(&self, id: Uuid) -> Result<Post, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    /// One author's posts, newest first.
    pub async fn get_posts_by_user(
        &self,
        author_id: Uuid,
        limit: usize,
        cursor: Cursor,
    ) -> Result<Page<Post>, DomainError> {
        let limit = effective_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
        let rows = self
            .repo
            .scan_by_author(author_id, cursor.boundary(), limit + 1)
            .await?;

        Ok(Page::from_lookahead(rows, limit, |p| p.created_at))
    }

    /// Proximity feed: scan the 3x3 window of coarse cells around the point,
    /// keep rows within the radius and order them by distance.
    ///
    /// Posts just outside the window are not found even when the radius would
    /// reach them.
    pub async fn get_nearby_posts(
        &self,
        query: &NearbyQuery,
    ) -> Result<Page<NearbyPost>, DomainError> {
        validate_point(query.latitude, query.longitude)?;

        let radius_km = if query.radius_km > 0.0 {
            query.radius_km
        } else {
            DEFAULT_RADIUS_KM
        };
        let limit = effective_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let per_cell = limit * 2;
        let before = query.cursor.boundary();

        let cells = spatial::neighbors(query.latitude, query.longitude);
        let scans = cells
            .iter()
            .map(|cell| self.repo.scan_by_cell(cell, before, per_cell));
        let batches = try_join_all(scans).await?;

        let mut candidates: Vec<NearbyPost> = batches
            .into_iter()
            .flatten()
            .filter_map(|post| {
                let distance_km = post.distance_to(query.latitude, query.longitude);
                (distance_km <= radius_km).then_some(NearbyPost { post, distance_km })
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| b.post.created_at.cmp(&a.post.created_at))
                .then_with(|| a.post.id.cmp(&b.post.id))
        });

        tracing::debug!(
            cells = cells.len(),
            candidates = candidates.len(),
            radius_km,
            "Nearby scan finished"
        );

        Ok(Page::from_lookahead(candidates, limit, |c| c.post.created_at))
    }

    /// Replay the secondary-view fan-out from the canonical row.
    pub async fn repair_views(&self, id: Uuid) -> Result<Post, DomainError> {
        let post = self.get_post_by_id(id).await?;
        self.repo
            .insert_views(&post, &ClientMeta::default(), &PostView::SECONDARY)
            .await?;

        tracing::info!(post_id = %id, "Secondary post views rewritten");
        Ok(post)
    }
}

fn validate_point(lat: f64, lng: f64) -> Result<(), DomainError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(DomainError::validation("latitude must be between -90 and 90"));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(DomainError::validation("longitude must be between -180 and 180"));
    }
    Ok(())
}
