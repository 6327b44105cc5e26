//! Service behavior over the in-memory adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use geofeed_core::domain::{
    Address, ClientMeta, FollowCounts, FollowEdge, LikeAuditEvent, LikeState, NearbyQuery,
    NewPost, Post, PostView, ResolvedPlace, TargetRef,
};
use geofeed_core::error::{DomainError, RepoError};
use geofeed_core::pagination::Cursor;
use geofeed_core::ports::{
    AddressLookup, CacheError, CounterCache, FollowRepository, JobQueue, JobResult,
    LikeRepository, LookupError, PostRepository,
};
use geofeed_core::services::{
    CommentStore, EngagementStore, LocationStore, PostStore, RelationshipStore, audit_job_handler,
};

use super::InMemoryStore;
use crate::cache::InMemoryCache;
use crate::jobs::{InMemoryJobQueue, InMemoryJobQueueConfig};

fn new_post(author: Uuid, lat: f64, lng: f64) -> NewPost {
    NewPost {
        author_id: author,
        content: format!("at {lat},{lng}"),
        media_refs: vec![],
        latitude: lat,
        longitude: lng,
        client_meta: ClientMeta {
            origin_address: Some("10.0.0.1".into()),
            user_agent: Some("test".into()),
        },
    }
}

fn engagement(store: Arc<InMemoryStore>, counters: Arc<dyn CounterCache>) -> EngagementStore {
    EngagementStore::new(store, counters, Arc::new(InMemoryJobQueue::default()))
}

/// Counter cache that is always down.
struct UnavailableCounters;

#[async_trait]
impl CounterCache for UnavailableCounters {
    async fn increment(&self, _key: &str) -> Result<i64, CacheError> {
        Err(CacheError::Connection("down".into()))
    }
    async fn decrement_floor(&self, _key: &str) -> Result<i64, CacheError> {
        Err(CacheError::Connection("down".into()))
    }
    async fn get(&self, _key: &str) -> Result<i64, CacheError> {
        Err(CacheError::Connection("down".into()))
    }
    async fn get_many(&self, _keys: &[String]) -> Result<Vec<i64>, CacheError> {
        Err(CacheError::Connection("down".into()))
    }
    async fn set(&self, _key: &str, _value: i64) -> Result<(), CacheError> {
        Err(CacheError::Connection("down".into()))
    }
}

/// Post repository whose secondary-view batch always fails.
struct BrokenFanOut(Arc<InMemoryStore>);

#[async_trait]
impl PostRepository for BrokenFanOut {
    async fn insert_views(
        &self,
        post: &Post,
        meta: &ClientMeta,
        views: &[PostView],
    ) -> Result<(), RepoError> {
        if views.contains(&PostView::ById) {
            self.0.insert_views(post, meta, views).await
        } else {
            Err(RepoError::Connection("batch timed out".into()))
        }
    }
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        PostRepository::find_by_id(self.0.as_ref(), id).await
    }
    async fn scan_by_cell(
        &self,
        cell_prefix: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        self.0.scan_by_cell(cell_prefix, before, limit).await
    }
    async fn scan_by_author(
        &self,
        author_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Post>, RepoError> {
        self.0.scan_by_author(author_id, before, limit).await
    }
}

/// Like repository whose audit writes hang.
struct SlowAudit(Arc<InMemoryStore>);

#[async_trait]
impl LikeRepository for SlowAudit {
    async fn insert_if_absent(&self, like: &LikeState) -> Result<bool, RepoError> {
        self.0.insert_if_absent(like).await
    }
    async fn exists(&self, target: &TargetRef, user_id: Uuid) -> Result<bool, RepoError> {
        self.0.exists(target, user_id).await
    }
    async fn delete_if_present(&self, target: &TargetRef, user_id: Uuid) -> Result<bool, RepoError> {
        self.0.delete_if_present(target, user_id).await
    }
    async fn count_for_target(&self, target: &TargetRef) -> Result<i64, RepoError> {
        self.0.count_for_target(target).await
    }
    async fn record_audit(&self, _event: &LikeAuditEvent) -> Result<(), RepoError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

/// Follow repository that stalls between the edge read and the caller's write.
struct LaggyFollows(Arc<InMemoryStore>);

#[async_trait]
impl FollowRepository for LaggyFollows {
    async fn insert_edge(&self, edge: &FollowEdge) -> Result<bool, RepoError> {
        self.0.insert_edge(edge).await
    }
    async fn find_edge(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Option<FollowEdge>, RepoError> {
        let edge = self.0.find_edge(follower_id, following_id).await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(edge)
    }
    async fn delete_edge(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError> {
        self.0.delete_edge(follower_id, following_id).await
    }
    async fn list_followers(&self, user_id: Uuid, limit: usize) -> Result<Vec<FollowEdge>, RepoError> {
        self.0.list_followers(user_id, limit).await
    }
    async fn list_following(&self, user_id: Uuid, limit: usize) -> Result<Vec<FollowEdge>, RepoError> {
        self.0.list_following(user_id, limit).await
    }
    async fn adjust_counts(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        delta: i64,
    ) -> Result<(), RepoError> {
        self.0.adjust_counts(follower_id, following_id, delta).await
    }
    async fn counts(&self, user_id: Uuid) -> Result<FollowCounts, RepoError> {
        self.0.counts(user_id).await
    }
}

struct StubLookup {
    calls: AtomicUsize,
    fail: bool,
}

impl StubLookup {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait]
impl AddressLookup for StubLookup {
    async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<ResolvedPlace, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LookupError::Status(503));
        }
        Ok(ResolvedPlace {
            display_name: "Gambir, Central Jakarta, Jakarta, Indonesia".into(),
            name: "Gambir".into(),
            address: Address {
                village: "Gambir".into(),
                city: "Central Jakarta".into(),
                country: "Indonesia".into(),
                country_code: "id".into(),
                ..Address::default()
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_then_get_by_id() {
    let store = Arc::new(InMemoryStore::new());
    let posts = PostStore::new(store);

    let created = posts
        .create_post(new_post(Uuid::new_v4(), -6.1754, 106.8272))
        .await
        .unwrap();
    let fetched = posts.get_post_by_id(created.id).await.unwrap();

    assert_eq!(fetched.content, created.content);
    assert_eq!(fetched.latitude, -6.1754);
    assert_eq!(fetched.longitude, 106.8272);
    assert_eq!(fetched.cell, created.cell);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_get_missing_post_is_not_found() {
    let posts = PostStore::new(Arc::new(InMemoryStore::new()));
    let err = posts.get_post_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity_type: "post", .. }));
}

#[tokio::test]
async fn test_invalid_post_writes_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let posts = PostStore::new(store.clone());
    let author = Uuid::new_v4();

    let mut input = new_post(author, 91.0, 0.0);
    assert!(matches!(
        posts.create_post(input.clone()).await,
        Err(DomainError::Validation(_))
    ));

    input.latitude = 0.0;
    input.media_refs = (0..5).map(|i| format!("m{i}")).collect();
    assert!(matches!(
        posts.create_post(input).await,
        Err(DomainError::Validation(_))
    ));

    let page = posts.get_posts_by_user(author, 10, Cursor::start()).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_nearby_includes_close_and_excludes_far() {
    let posts = PostStore::new(Arc::new(InMemoryStore::new()));
    let author = Uuid::new_v4();

    let a = posts.create_post(new_post(author, -6.1710, 106.8272)).await.unwrap();
    let b = posts.create_post(new_post(author, -6.9175, 107.6191)).await.unwrap();

    let page = posts
        .get_nearby_posts(&NearbyQuery {
            latitude: -6.1754,
            longitude: 106.8272,
            radius_km: 5.0,
            limit: 10,
            cursor: Cursor::start(),
        })
        .await
        .unwrap();

    let ids: Vec<Uuid> = page.items.iter().map(|p| p.post.id).collect();
    assert!(ids.contains(&a.id));
    assert!(!ids.contains(&b.id));
    assert!(!page.has_more);
    assert!(page.next_cursor.is_empty());
}

#[tokio::test]
async fn test_nearby_results_within_radius_and_sorted() {
    let posts = PostStore::new(Arc::new(InMemoryStore::new()));
    let author = Uuid::new_v4();
    let (lat, lng) = (-6.2000, 106.8166);

    for i in 0..12 {
        let offset = f64::from(i) * 0.004;
        posts
            .create_post(new_post(author, lat + offset, lng - offset))
            .await
            .unwrap();
    }

    let page = posts
        .get_nearby_posts(&NearbyQuery {
            latitude: lat,
            longitude: lng,
            radius_km: 3.0,
            limit: 50,
            cursor: Cursor::start(),
        })
        .await
        .unwrap();

    assert!(!page.items.is_empty());
    for item in &page.items {
        assert!(item.distance_km <= 3.0);
    }
    for pair in page.items.windows(2) {
        assert!(pair[0].distance_km <= pair[1].distance_km);
    }
}

#[tokio::test]
async fn test_nearby_defaults_and_has_more() {
    let posts = PostStore::new(Arc::new(InMemoryStore::new()));
    let author = Uuid::new_v4();

    for _ in 0..4 {
        posts.create_post(new_post(author, 48.8566, 2.3522)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let page = posts
        .get_nearby_posts(&NearbyQuery {
            latitude: 48.8566,
            longitude: 2.3522,
            radius_km: 0.0,
            limit: 3,
            cursor: Cursor::start(),
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert!(page.has_more);
    let cursor = Cursor::decode(&page.next_cursor).unwrap();
    assert_eq!(cursor.boundary(), Some(page.items[2].post.created_at));
}

#[tokio::test]
async fn test_nearby_rejects_bad_coordinates() {
    let posts = PostStore::new(Arc::new(InMemoryStore::new()));
    let err = posts
        .get_nearby_posts(&NearbyQuery {
            latitude: 0.0,
            longitude: 200.0,
            ..NearbyQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_posts_by_user_paginates_newest_first() {
    let posts = PostStore::new(Arc::new(InMemoryStore::new()));
    let author = Uuid::new_v4();

    let mut created = Vec::new();
    for _ in 0..5 {
        created.push(posts.create_post(new_post(author, 1.0, 1.0)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let first = posts.get_posts_by_user(author, 2, Cursor::start()).await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(first.has_more);
    assert_eq!(first.items[0].id, created[4].id);
    assert_eq!(first.items[1].id, created[3].id);

    let cursor = Cursor::decode(&first.next_cursor).unwrap();
    let second = posts.get_posts_by_user(author, 2, cursor).await.unwrap();
    assert_eq!(second.items[0].id, created[2].id);
    assert_eq!(second.items[1].id, created[1].id);

    let cursor = Cursor::decode(&second.next_cursor).unwrap();
    let last = posts.get_posts_by_user(author, 2, cursor).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_more);
    assert!(last.next_cursor.is_empty());
}

#[tokio::test]
async fn test_fan_out_failure_surfaces_and_repair_restores_views() {
    let store = Arc::new(InMemoryStore::new());
    let broken = PostStore::new(Arc::new(BrokenFanOut(store.clone())));
    let author = Uuid::new_v4();

    let err = broken
        .create_post(new_post(author, 35.6762, 139.6503))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Storage(_)));

    let posts = PostStore::new(store.clone());
    let orphaned = posts.get_posts_by_user(author, 10, Cursor::start()).await.unwrap();
    assert!(orphaned.items.is_empty());

    let written = posts
        .create_post(new_post(author, 35.6762, 139.6503))
        .await
        .unwrap();
    store.remove_view(&written, PostView::ByAuthor).await;
    store.remove_view(&written, PostView::ByCell).await;

    let repaired = posts.repair_views(written.id).await.unwrap();
    assert_eq!(repaired.id, written.id);
    let page = posts.get_posts_by_user(author, 10, Cursor::start()).await.unwrap();
    assert_eq!(page.items.len(), 1);

    assert!(matches!(
        posts.repair_views(Uuid::new_v4()).await,
        Err(DomainError::NotFound { .. })
    ));
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_like_twice_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let likes = engagement(store, Arc::new(InMemoryCache::new()));
    let target = TargetRef::post(Uuid::new_v4());
    let user = Uuid::new_v4();

    let first = likes.toggle_like(target, user, true).await.unwrap();
    assert!(first.changed);
    assert!(first.is_liked);
    assert_eq!(first.like_count, 1);

    let second = likes.toggle_like(target, user, true).await.unwrap();
    assert!(!second.changed);
    assert!(second.is_liked);
    assert_eq!(second.like_count, 1);
}

#[tokio::test]
async fn test_concurrent_likes_change_once() {
    let store = Arc::new(InMemoryStore::new());
    let likes = engagement(store.clone(), Arc::new(InMemoryCache::new()));
    let target = TargetRef::post(Uuid::new_v4());
    let user = Uuid::new_v4();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let likes = likes.clone();
            tokio::spawn(async move { likes.toggle_like(target, user, true).await.unwrap() })
        })
        .collect();

    let mut changed = 0;
    for task in tasks {
        if task.await.unwrap().changed {
            changed += 1;
        }
    }

    assert_eq!(changed, 1);
    assert_eq!(likes.get_like_count(target).await.unwrap(), 1);
    assert!(likes.has_user_liked(target, user).await.unwrap());
    assert_eq!(store.count_for_target(&target).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_unlikes_change_once() {
    let store = Arc::new(InMemoryStore::new());
    let likes = engagement(store.clone(), Arc::new(InMemoryCache::new()));
    let target = TargetRef::post(Uuid::new_v4());
    let user = Uuid::new_v4();

    let liked = likes.toggle_like(target, user, true).await.unwrap();
    assert_eq!(liked.like_count, 1);

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let likes = likes.clone();
            tokio::spawn(async move { likes.toggle_like(target, user, false).await.unwrap() })
        })
        .collect();

    let mut changed = 0;
    for task in tasks {
        let result = task.await.unwrap();
        assert!(result.like_count >= 0);
        assert!(!result.is_liked);
        if result.changed {
            changed += 1;
        }
    }

    assert_eq!(changed, 1);
    assert_eq!(likes.get_like_count(target).await.unwrap(), 0);
    assert!(!likes.has_user_liked(target, user).await.unwrap());
    assert_eq!(store.count_for_target(&target).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unlike_without_like_never_goes_negative() {
    let likes = engagement(Arc::new(InMemoryStore::new()), Arc::new(InMemoryCache::new()));
    let target = TargetRef::comment(Uuid::new_v4());

    let result = likes.toggle_like(target, Uuid::new_v4(), false).await.unwrap();
    assert!(!result.changed);
    assert!(!result.is_liked);
    assert_eq!(result.like_count, 0);
}

#[tokio::test]
async fn test_like_then_unlike() {
    let likes = engagement(Arc::new(InMemoryStore::new()), Arc::new(InMemoryCache::new()));
    let target = TargetRef::post(Uuid::new_v4());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    likes.toggle_like(target, alice, true).await.unwrap();
    likes.toggle_like(target, bob, true).await.unwrap();

    let result = likes.toggle_like(target, alice, false).await.unwrap();
    assert!(result.changed);
    assert_eq!(result.like_count, 1);
    assert!(!likes.has_user_liked(target, alice).await.unwrap());
    assert!(likes.has_user_liked(target, bob).await.unwrap());
}

#[tokio::test]
async fn test_cache_outage_falls_back_to_durable_count() {
    let store = Arc::new(InMemoryStore::new());
    let likes = engagement(store, Arc::new(UnavailableCounters));
    let target = TargetRef::post(Uuid::new_v4());

    let a = likes.toggle_like(target, Uuid::new_v4(), true).await.unwrap();
    let b = likes.toggle_like(target, Uuid::new_v4(), true).await.unwrap();
    assert!(a.changed && b.changed);
    assert_eq!(b.like_count, 2);
    assert_eq!(likes.get_like_count(target).await.unwrap(), 2);

    let summaries = likes.get_likes_for_posts(&[target.target_id], None).await.unwrap();
    assert_eq!(summaries[&target.target_id].like_count, 2);

    let sync = likes.sync_counter_from_durable_state(target).await.unwrap();
    assert_eq!(sync.durable_count, 2);
    assert!(!sync.cache_updated);
}

#[tokio::test]
async fn test_batch_likes_for_posts() {
    let likes = engagement(Arc::new(InMemoryStore::new()), Arc::new(InMemoryCache::new()));
    let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let viewer = Uuid::new_v4();

    likes.toggle_like(TargetRef::post(p1), viewer, true).await.unwrap();
    likes.toggle_like(TargetRef::post(p1), Uuid::new_v4(), true).await.unwrap();
    likes.toggle_like(TargetRef::post(p2), Uuid::new_v4(), true).await.unwrap();

    let anonymous = likes.get_likes_for_posts(&[p1, p2, p3], None).await.unwrap();
    assert_eq!(anonymous[&p1].like_count, 2);
    assert_eq!(anonymous[&p2].like_count, 1);
    assert_eq!(anonymous[&p3].like_count, 0);
    assert!(anonymous.values().all(|s| !s.is_liked));

    let personal = likes.get_likes_for_posts(&[p1, p2, p3], Some(viewer)).await.unwrap();
    assert!(personal[&p1].is_liked);
    assert!(!personal[&p2].is_liked);
    assert!(!personal[&p3].is_liked);

    assert!(likes.get_likes_for_posts(&[], Some(viewer)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_counter_repairs_drift() {
    let counters = Arc::new(InMemoryCache::new());
    let likes = engagement(Arc::new(InMemoryStore::new()), counters.clone());
    let target = TargetRef::post(Uuid::new_v4());

    likes.toggle_like(target, Uuid::new_v4(), true).await.unwrap();
    CounterCache::set(counters.as_ref(), &target.counter_key(), 40).await.unwrap();
    assert_eq!(likes.get_like_count(target).await.unwrap(), 40);

    let sync = likes.sync_counter_from_durable_state(target).await.unwrap();
    assert_eq!(sync.durable_count, 1);
    assert!(sync.cache_updated);
    assert_eq!(likes.get_like_count(target).await.unwrap(), 1);
}

#[tokio::test]
async fn test_audit_jobs_replicate_transitions() {
    let store = Arc::new(InMemoryStore::new());
    let queue = Arc::new(InMemoryJobQueue::new(InMemoryJobQueueConfig {
        retry_backoff: Duration::from_millis(1),
        ..InMemoryJobQueueConfig::default()
    }));
    queue
        .start_worker(audit_job_handler(store.clone(), Duration::from_secs(1)))
        .await
        .unwrap();
    let likes = EngagementStore::new(store.clone(), Arc::new(InMemoryCache::new()), queue.clone());

    let target = TargetRef::post(Uuid::new_v4());
    let user = Uuid::new_v4();

    likes.toggle_like(target, user, true).await.unwrap();
    likes.toggle_like(target, user, true).await.unwrap();

    let mut replicated = false;
    for _ in 0..100 {
        if store.audited_users(&target).await == vec![user] {
            replicated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(replicated);

    likes.toggle_like(target, user, false).await.unwrap();
    for _ in 0..100 {
        if queue.stats().await.unwrap().completed == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(queue.stats().await.unwrap().completed, 2);
    assert!(store.audited_users(&target).await.is_empty());
}

#[tokio::test]
async fn test_audit_handler_times_out() {
    let store = Arc::new(InMemoryStore::new());
    let handler = audit_job_handler(Arc::new(SlowAudit(store)), Duration::from_millis(20));

    let event = LikeAuditEvent {
        action: geofeed_core::domain::AuditAction::Liked,
        target: TargetRef::post(Uuid::new_v4()),
        user_id: Uuid::new_v4(),
        at: Utc::now(),
    };
    let job = geofeed_core::ports::Job::new("like_audit", &event).unwrap();

    assert!(matches!(handler(job).await, JobResult::Retry(_)));

    let stray = geofeed_core::ports::Job::new("email", &"x").unwrap();
    assert!(matches!(handler(stray).await, JobResult::Failed(_)));
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_follow_lifecycle() {
    let graph = RelationshipStore::new(Arc::new(InMemoryStore::new()));
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(graph.follow(alice, bob).await.unwrap());
    assert!(!graph.follow(alice, bob).await.unwrap());
    assert!(graph.is_following(alice, bob).await.unwrap());
    assert!(!graph.is_following(bob, alice).await.unwrap());

    let bob_counts = graph.follow_counts(bob).await.unwrap();
    assert_eq!(bob_counts.followers_count, 1);
    assert_eq!(bob_counts.following_count, 0);
    assert_eq!(graph.follow_counts(alice).await.unwrap().following_count, 1);

    let followers = graph.followers(bob, 0).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].follower_id, alice);
    assert_eq!(graph.following(alice, 10).await.unwrap()[0].following_id, bob);

    graph.unfollow(alice, bob).await.unwrap();
    assert!(!graph.is_following(alice, bob).await.unwrap());
    assert_eq!(graph.follow_counts(bob).await.unwrap().followers_count, 0);
    assert!(graph.followers(bob, 10).await.unwrap().is_empty());

    assert!(matches!(
        graph.unfollow(alice, bob).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_self_follow_rejected_and_counts_clamped() {
    let store = Arc::new(InMemoryStore::new());
    let graph = RelationshipStore::new(store.clone());
    let user = Uuid::new_v4();

    assert!(matches!(
        graph.follow(user, user).await,
        Err(DomainError::Validation(_))
    ));

    store.adjust_counts(user, Uuid::new_v4(), -2).await.unwrap();
    let counts = graph.follow_counts(user).await.unwrap();
    assert_eq!(counts.following_count, 0);
    assert_eq!(counts.followers_count, 0);
}

#[tokio::test]
async fn test_concurrent_follows_count_once() {
    let store = Arc::new(InMemoryStore::new());
    let graph = RelationshipStore::new(Arc::new(LaggyFollows(store.clone())));
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            tokio::spawn(async move { graph.follow(alice, bob).await.unwrap() })
        })
        .collect();

    let mut changed = 0;
    for task in tasks {
        if task.await.unwrap() {
            changed += 1;
        }
    }

    assert_eq!(changed, 1);
    assert_eq!(graph.follow_counts(bob).await.unwrap().followers_count, 1);
    assert_eq!(graph.follow_counts(alice).await.unwrap().following_count, 1);
    assert_eq!(graph.followers(bob, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_unfollows_count_once() {
    let store = Arc::new(InMemoryStore::new());
    let graph = RelationshipStore::new(Arc::new(LaggyFollows(store.clone())));
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    assert!(graph.follow(alice, bob).await.unwrap());

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            tokio::spawn(async move { graph.unfollow(alice, bob).await })
        })
        .collect();

    let mut removed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => removed += 1,
            Err(DomainError::NotFound { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(removed, 1);
    assert_eq!(graph.follow_counts(bob).await.unwrap().followers_count, 0);
    assert_eq!(graph.follow_counts(alice).await.unwrap().following_count, 0);
    assert!(!graph.is_following(alice, bob).await.unwrap());
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

async fn post_with_comments() -> (Arc<InMemoryStore>, CommentStore, Post) {
    let store = Arc::new(InMemoryStore::new());
    let post = PostStore::new(store.clone())
        .create_post(new_post(Uuid::new_v4(), 51.5072, -0.1276))
        .await
        .unwrap();
    let comments = CommentStore::new(store.clone(), store.clone());
    (store, comments, post)
}

#[tokio::test]
async fn test_comment_thread_nests_replies() {
    let (_, comments, post) = post_with_comments().await;
    let author = Uuid::new_v4();

    let top = comments.create_comment(post.id, author, "first".into(), None).await.unwrap();
    let reply = comments
        .create_comment(post.id, author, "reply".into(), Some(top.id))
        .await
        .unwrap();
    let nested = comments
        .create_comment(post.id, author, "nested".into(), Some(reply.id))
        .await
        .unwrap();
    assert_eq!(nested.depth, 3);

    let too_deep = comments
        .create_comment(post.id, author, "too deep".into(), Some(nested.id))
        .await;
    assert!(matches!(too_deep, Err(DomainError::Validation(_))));

    let thread = comments.comment_thread(post.id, 0).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].replies[0].comment.id, reply.id);
    assert_eq!(thread[0].replies[0].replies[0].comment.id, nested.id);
    assert_eq!(comments.comment_count(post.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_comment_validation() {
    let (store, comments, post) = post_with_comments().await;
    let author = Uuid::new_v4();

    assert!(matches!(
        comments.create_comment(post.id, author, "   ".into(), None).await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        comments.create_comment(post.id, author, "x".repeat(2001), None).await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        comments.create_comment(Uuid::new_v4(), author, "hi".into(), None).await,
        Err(DomainError::NotFound { entity_type: "post", .. })
    ));

    let other = PostStore::new(store)
        .create_post(new_post(author, 0.0, 0.0))
        .await
        .unwrap();
    let elsewhere = comments.create_comment(other.id, author, "there".into(), None).await.unwrap();
    assert!(matches!(
        comments
            .create_comment(post.id, author, "cross".into(), Some(elsewhere.id))
            .await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_only_author_deletes_comment() {
    let (_, comments, post) = post_with_comments().await;
    let author = Uuid::new_v4();
    let comment = comments.create_comment(post.id, author, "mine".into(), None).await.unwrap();

    assert!(matches!(
        comments.delete_comment(comment.id, Uuid::new_v4()).await,
        Err(DomainError::Forbidden(_))
    ));

    comments.delete_comment(comment.id, author).await.unwrap();
    assert!(matches!(
        comments.get_comment(comment.id).await,
        Err(DomainError::NotFound { .. })
    ));
    assert_eq!(comments.comment_count(post.id).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_label_resolved_once_then_cached() {
    let store = Arc::new(InMemoryStore::new());
    let lookup = StubLookup::new(false);
    let locations = LocationStore::new(
        Arc::new(InMemoryCache::new()),
        store.clone(),
        Some(lookup.clone()),
    );

    let label = locations.label_for(-6.1754, 106.8272).await.unwrap().unwrap();
    assert_eq!(label.name, "Gambir");
    assert_eq!(label.cell_prefix, geofeed_core::spatial::cell_prefix(-6.1754, 106.8272));

    // Same coarse cell: no second lookup.
    let again = locations.label_for(-6.1755, 106.8273).await.unwrap().unwrap();
    assert_eq!(again.name, "Gambir");
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

    // Durable copy survives a cold cache.
    let cold = LocationStore::new(Arc::new(InMemoryCache::new()), store, None);
    assert!(cold.label_for(-6.1754, 106.8272).await.unwrap().is_some());
}

#[tokio::test]
async fn test_label_lookup_absent_or_failing() {
    let store = Arc::new(InMemoryStore::new());
    let none = LocationStore::new(Arc::new(InMemoryCache::new()), store.clone(), None);
    assert!(none.label_for(10.0, 10.0).await.unwrap().is_none());

    let failing = LocationStore::new(
        Arc::new(InMemoryCache::new()),
        store,
        Some(StubLookup::new(true)),
    );
    assert!(failing.label_for(10.0, 10.0).await.unwrap().is_none());
    assert!(matches!(
        failing.label_for(95.0, 10.0).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_labels_for_posts_one_lookup_per_cell() {
    let store = Arc::new(InMemoryStore::new());
    let lookup = StubLookup::new(false);
    let posts = PostStore::new(store.clone());
    let locations = LocationStore::new(
        Arc::new(InMemoryCache::new()),
        store,
        Some(lookup.clone()),
    );
    let author = Uuid::new_v4();

    let batch = vec![
        posts.create_post(new_post(author, -6.1754, 106.8272)).await.unwrap(),
        posts.create_post(new_post(author, -6.1755, 106.8271)).await.unwrap(),
        posts.create_post(new_post(author, 40.7128, -74.0060)).await.unwrap(),
    ];

    let labels = locations.labels_for_posts(&batch).await;
    assert_eq!(labels.len(), 2);
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
}
