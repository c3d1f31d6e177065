//! Integration tests for the cache-aside post service.

mod common;

use common::TestApp;
use echoes_cache::PaginationScope;
use echoes_core::{EchoesError, PageRequest, PostId};
use echoes_service::{CreatePostRequest, PostService, UpdatePostRequest};
use std::time::Duration;

fn new_post(title: &str) -> CreatePostRequest {
    CreatePostRequest::new(title, format!("{title} body"), false)
}

#[tokio::test]
async fn test_page_miss_falls_back_then_hits() {
    let app = TestApp::new();
    for i in 0..3 {
        app.posts.create_post(new_post(&format!("Post {i}"))).await.unwrap();
    }
    app.settle().await;

    let first = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.len(), 3);
    assert_eq!(app.db.page_reads(), 1);

    app.settle().await;

    let second = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(app.db.page_reads(), 1, "second read should be served from cache");
}

#[tokio::test]
async fn test_last_page_number_is_served() {
    let app = TestApp::new();
    app.posts.create_post(new_post("Only")).await.unwrap();
    app.settle().await;

    let request = PageRequest::new(u32::MAX, 10);
    let page = app.posts.get_posts_page(request).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total, 1);
    assert_eq!(page.next_page, u32::MAX);
    app.settle().await;

    let cached = app.cache.post_pages().get_page(&PaginationScope::Posts, request).await;
    assert!(cached.is_hit());
}

#[tokio::test]
async fn test_page_population_caches_entities() {
    let app = TestApp::new();
    let post = app.posts.create_post(new_post("Hello")).await.unwrap();
    app.settle().await;
    app.cache.posts().delete(&post.id).await;

    app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    app.settle().await;

    assert_eq!(app.cache.posts().get(&post.id).await, Some(post));
}

#[tokio::test]
async fn test_create_rotates_version_and_keeps_old_pages() {
    let app = TestApp::new();
    app.posts.create_post(new_post("First")).await.unwrap();
    app.settle().await;

    app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    app.settle().await;

    let pages = app.cache.post_pages();
    let v0 = pages.version(&PaginationScope::Posts).await;
    let v0_pages = app.cached_keys(&format!("posts:{v0}:page"));
    assert_eq!(v0_pages.len(), 1);

    let created = app.posts.create_post(new_post("Second")).await.unwrap();
    app.settle().await;

    let v1 = pages.version(&PaginationScope::Posts).await;
    assert!(v1 > v0);
    assert_eq!(app.cached_keys(&format!("posts:{v0}:page")), v0_pages);

    let page = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().any(|p| p.id == created.id));
}

#[tokio::test]
async fn test_page_sizes_are_cached_separately() {
    let app = TestApp::new();
    for i in 0..3 {
        app.posts.create_post(new_post(&format!("Post {i}"))).await.unwrap();
    }
    app.settle().await;

    let small = app.posts.get_posts_page(PageRequest::new(1, 2)).await.unwrap();
    app.settle().await;
    let large = app.posts.get_posts_page(PageRequest::new(1, 10)).await.unwrap();

    assert_eq!(small.len(), 2);
    assert!(small.has_next);
    assert_eq!(large.len(), 3);
    assert!(!large.has_next);
    assert_eq!(app.db.page_reads(), 2);
}

#[tokio::test]
async fn test_reads_survive_cache_outage() {
    let app = TestApp::new();
    app.store.set_failing(true);

    let post = app.posts.create_post(new_post("Hello")).await.unwrap();

    let page = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(page.items, vec![post.clone()]);

    let fetched = app.posts.get_post(&post.id).await.unwrap();
    assert_eq!(fetched, post);

    app.settle().await;
    assert!(app.store.inner().is_empty());
}

#[tokio::test]
async fn test_writes_do_not_wait_for_slow_cache() {
    let app = TestApp::new();
    app.store.set_delay(Duration::from_secs(3));

    let post = tokio::time::timeout(Duration::from_millis(500), app.posts.create_post(new_post("Hello")))
        .await
        .expect("write waited on the cache")
        .unwrap();

    tokio::time::timeout(Duration::from_millis(500), app.posts.pin_post(&post.id))
        .await
        .expect("pin waited on the cache")
        .unwrap();
}

#[tokio::test]
async fn test_source_errors_propagate() {
    let app = TestApp::new();
    app.db.set_failing(true);

    let err = app.posts.get_posts_page(PageRequest::first()).await.unwrap_err();
    assert!(matches!(err, EchoesError::Database(_)));

    let err = app.posts.create_post(new_post("Hello")).await.unwrap_err();
    assert!(matches!(err, EchoesError::Database(_)));

    let err = app.posts.get_post(&PostId::from("p1")).await.unwrap_err();
    assert!(matches!(err, EchoesError::Database(_)));
}

#[tokio::test]
async fn test_cache_hit_does_not_touch_source() {
    let app = TestApp::new();
    let post = app.posts.create_post(new_post("Hello")).await.unwrap();
    app.settle().await;

    app.db.set_failing(true);
    assert_eq!(app.posts.get_post(&post.id).await.unwrap(), post);
}

#[tokio::test]
async fn test_missing_post_is_not_found() {
    let app = TestApp::new();
    let id = PostId::from("missing");

    let err = app.posts.get_post(&id).await.unwrap_err();
    assert!(matches!(err, EchoesError::NotFound { .. }));
    assert_eq!(err.status_code(), 404);

    assert!(matches!(app.posts.delete_post(&id).await, Err(EchoesError::NotFound { .. })));
    assert!(matches!(app.posts.pin_post(&id).await, Err(EchoesError::NotFound { .. })));

    let update = UpdatePostRequest {
        title: "t".to_string(),
        content: "c".to_string(),
        tweet: false,
    };
    assert!(matches!(
        app.posts.update_post(&id, update).await,
        Err(EchoesError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_blank_post_is_rejected() {
    let app = TestApp::new();
    let err = app.posts.create_post(new_post("   ")).await.unwrap_err();
    assert!(matches!(err, EchoesError::Validation(_)));
    assert_eq!(app.cache.tasks().in_flight(), 0);
}

#[tokio::test]
async fn test_update_refreshes_snapshot() {
    let app = TestApp::new();
    let post = app.posts.create_post(new_post("Draft")).await.unwrap();
    app.settle().await;

    let update = UpdatePostRequest {
        title: "  Final ".to_string(),
        content: "Final body".to_string(),
        tweet: true,
    };
    let updated = app.posts.update_post(&post.id, update).await.unwrap();
    assert_eq!(updated.title, "Final");
    app.settle().await;

    let cached = app.cache.posts().get(&post.id).await.unwrap();
    assert_eq!(cached.title, "Final");
    assert!(cached.tweet);
}

#[tokio::test]
async fn test_pin_moves_post_to_the_top() {
    let app = TestApp::new();
    let old = app.posts.create_post(new_post("Old")).await.unwrap();
    app.posts.create_post(new_post("New")).await.unwrap();
    app.settle().await;

    let pinned = app.posts.pin_post(&old.id).await.unwrap();
    assert!(pinned.pinned);
    app.settle().await;

    let page = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(page.items[0].id, old.id);
    assert!(app.cache.posts().get(&old.id).await.unwrap().pinned);

    let unpinned = app.posts.pin_post(&old.id).await.unwrap();
    assert!(!unpinned.pinned);
}

#[tokio::test]
async fn test_delete_evicts_and_rotates_both_scopes() {
    let app = TestApp::new();
    let post = app.posts.create_post(new_post("Doomed")).await.unwrap();
    app.settle().await;

    let comments_scope = PaginationScope::PostComments(post.id.clone());
    let posts_v0 = app.cache.post_pages().version(&PaginationScope::Posts).await;
    let comments_v0 = app.cache.comment_pages().version(&comments_scope).await;

    app.posts.delete_post(&post.id).await.unwrap();
    app.settle().await;

    assert!(app.cache.posts().get(&post.id).await.is_none());
    assert!(app.cache.post_pages().version(&PaginationScope::Posts).await > posts_v0);
    assert!(app.cache.comment_pages().version(&comments_scope).await > comments_v0);
    assert!(matches!(
        app.posts.get_post(&post.id).await,
        Err(EchoesError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_explicit_invalidation() {
    let app = TestApp::new();
    let pages = app.cache.post_pages();
    let v0 = pages.version(&PaginationScope::Posts).await;

    let v1 = app.posts.invalidate_pagination().await;
    assert!(v1 > v0);
    assert_eq!(pages.version(&PaginationScope::Posts).await, v1);
}
