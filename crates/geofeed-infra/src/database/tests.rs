use std::collections::BTreeMap;

use chrono::{SubsecRound, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
use uuid::Uuid;

use geofeed_core::domain::{ClientMeta, FollowEdge, LikeState, Post, PostView, TargetRef};
use geofeed_core::ports::{FollowRepository, LikeRepository, LocationRepository, PostRepository};

use super::entity::{follow_counts, location_names, posts_by_cell, posts_by_id};
use super::{
    PostgresFollowRepository, PostgresLikeRepository, PostgresLocationRepository,
    PostgresPostRepository,
};

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

#[tokio::test]
async fn test_find_post_by_id_maps_canonical_row() {
    let post_id = Uuid::now_v7();
    let author_id = Uuid::new_v4();
    let now = Utc::now().trunc_subsecs(6);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![posts_by_id::Model {
            post_id,
            author_id,
            content: "sunset at the pier".to_owned(),
            media_refs: serde_json::json!(["a.jpg", "b.jpg"]),
            latitude: -8.65,
            longitude: 115.13,
            cell: "qw3ks5h".to_owned(),
            cell_prefix: "qw3ks".to_owned(),
            created_at: now.into(),
            origin_address: Some("203.0.113.9".to_owned()),
            user_agent: None,
        }]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let post = repo.find_by_id(post_id).await.unwrap().unwrap();

    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author_id);
    assert_eq!(post.media_refs, vec!["a.jpg", "b.jpg"]);
    assert_eq!(post.cell_prefix, "qw3ks");
    assert_eq!(post.created_at, now);
}

#[tokio::test]
async fn test_insert_views_writes_each_view() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(1)])
        .into_connection();
    let repo = PostgresPostRepository::new(db.clone());

    let post = Post {
        id: Uuid::now_v7(),
        author_id: Uuid::new_v4(),
        content: "hi".into(),
        media_refs: vec![],
        latitude: 1.0,
        longitude: 2.0,
        cell: "s01mtw0".into(),
        cell_prefix: "s01mt".into(),
        created_at: Utc::now().trunc_subsecs(6),
    };

    repo.insert_views(&post, &ClientMeta::default(), &PostView::SECONDARY)
        .await
        .unwrap();

    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains("posts_by_cell"));
    assert!(log.contains("posts_by_author"));
    assert!(log.contains("ON CONFLICT"));
}

#[tokio::test]
async fn test_scan_by_cell_is_bounded_and_newest_first() {
    let now = Utc::now().trunc_subsecs(6);
    let row = posts_by_cell::Model {
        cell_prefix: "u4pru".to_owned(),
        created_at: now.into(),
        post_id: Uuid::now_v7(),
        author_id: Uuid::new_v4(),
        content: "x".to_owned(),
        media_refs: serde_json::json!([]),
        latitude: 57.64,
        longitude: 10.40,
        cell: "u4pruyd".to_owned(),
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row.clone()]])
        .into_connection();
    let repo = PostgresPostRepository::new(db.clone());

    let posts = repo.scan_by_cell("u4pru", Some(now), 20).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, row.post_id);

    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains(r#"\"posts_by_cell\".\"created_at\" <"#));
    assert!(log.contains(r#"ORDER BY \"posts_by_cell\".\"created_at\" DESC"#));
}

#[tokio::test]
async fn test_conditional_like_writes_report_whether_applied() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(0), exec(1), exec(0)])
        .into_connection();
    let repo = PostgresLikeRepository::new(db);

    let like = LikeState {
        target: TargetRef::post(Uuid::new_v4()),
        user_id: Uuid::new_v4(),
        created_at: Utc::now(),
    };

    assert!(repo.insert_if_absent(&like).await.unwrap());
    assert!(!repo.insert_if_absent(&like).await.unwrap());
    assert!(repo.delete_if_present(&like.target, like.user_id).await.unwrap());
    assert!(!repo.delete_if_present(&like.target, like.user_id).await.unwrap());
}

#[tokio::test]
async fn test_count_for_target() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[BTreeMap::from([(
            "num_items",
            Value::BigInt(Some(3)),
        )])]])
        .into_connection();
    let repo = PostgresLikeRepository::new(db);

    let count = repo
        .count_for_target(&TargetRef::comment(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_conditional_follow_writes_report_whether_applied() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(1), exec(0), exec(1), exec(1), exec(0)])
        .into_connection();
    let repo = PostgresFollowRepository::new(db);

    let edge = FollowEdge {
        follower_id: Uuid::new_v4(),
        following_id: Uuid::new_v4(),
        created_at: Utc::now().trunc_subsecs(6),
    };

    assert!(repo.insert_edge(&edge).await.unwrap());
    assert!(!repo.insert_edge(&edge).await.unwrap());
    assert!(repo.delete_edge(edge.follower_id, edge.following_id).await.unwrap());
    assert!(!repo.delete_edge(edge.follower_id, edge.following_id).await.unwrap());
}

#[tokio::test]
async fn test_follow_counts_default_to_zero() {
    let user_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<follow_counts::Model>::new()])
        .append_query_results([vec![follow_counts::Model {
            user_id,
            followers_count: 7,
            following_count: 2,
        }]])
        .into_connection();
    let repo = PostgresFollowRepository::new(db);

    let empty = repo.counts(user_id).await.unwrap();
    assert_eq!(empty.user_id, user_id);
    assert_eq!((empty.followers_count, empty.following_count), (0, 0));

    let counts = repo.counts(user_id).await.unwrap();
    assert_eq!((counts.followers_count, counts.following_count), (7, 2));
}

#[tokio::test]
async fn test_location_label_decodes_address() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![location_names::Model {
            cell_prefix: "qqguw".to_owned(),
            display_name: "Gambir, Jakarta".to_owned(),
            name: "Gambir".to_owned(),
            address: serde_json::json!({"village": "Gambir", "country_code": "id"}),
            latitude: -6.1754,
            longitude: 106.8272,
            created_at: Utc::now().into(),
        }]])
        .into_connection();
    let repo = PostgresLocationRepository::new(db);

    let label = repo.get("qqguw").await.unwrap().unwrap();
    assert_eq!(label.address.village, "Gambir");
    assert_eq!(label.address.country_code, "id");
    assert!(label.address.city.is_empty());
}
