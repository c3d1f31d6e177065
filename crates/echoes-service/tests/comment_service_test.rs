//! Integration tests for the cache-aside comment service.

mod common;

use common::TestApp;
use echoes_cache::{KeyValueStore, PaginationScope};
use echoes_core::{Comment, CommentId, EchoesError, PageRequest, PageResult, Post, PostId};
use echoes_service::{CommentService, CreateCommentRequest, CreatePostRequest, PostService};

async fn seed_post(app: &TestApp) -> Post {
    let post = app
        .posts
        .create_post(CreatePostRequest::new("Hello", "World", false))
        .await
        .unwrap();
    app.settle().await;
    post
}

fn new_comment(content: &str) -> CreateCommentRequest {
    CreateCommentRequest::new("Ann", "ann@example.com", content)
}

#[tokio::test]
async fn test_new_comment_rotates_version_and_leaves_old_page() {
    let app = TestApp::new();
    let post = seed_post(&app).await;
    app.comments.create_comment(&post.id, new_comment("first")).await.unwrap();
    app.settle().await;

    let scope = PaginationScope::PostComments(post.id.clone());
    let pages = app.cache.comment_pages();

    let page_v0 = app
        .comments
        .get_post_comments(&post.id, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(page_v0.total, 1);
    app.settle().await;

    let v0 = pages.version(&scope).await;
    assert!(pages.get_page(&scope, PageRequest::first()).await.is_hit());

    let second = app.comments.create_comment(&post.id, new_comment("second")).await.unwrap();
    app.settle().await;

    let v1 = pages.version(&scope).await;
    assert!(v1 > v0);

    // Nothing is cached under the new version yet.
    assert!(!pages.get_page(&scope, PageRequest::first()).await.is_hit());

    let reads = app.db.page_reads();
    let page_v1 = app
        .comments
        .get_post_comments(&post.id, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(app.db.page_reads(), reads + 1);
    assert_eq!(page_v1.total, 2);
    assert!(page_v1.items.iter().any(|c| c.id == second.id));

    let v0_key = app.cache.keys().page(&scope, v0, PageRequest::first());
    let raw = app
        .store
        .inner()
        .get(&v0_key)
        .await
        .unwrap()
        .expect("old page is still stored");
    let cached: PageResult<Comment> = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached, page_v0);
}

#[tokio::test]
async fn test_comment_pages_are_scoped_per_post() {
    let app = TestApp::new();
    let first = seed_post(&app).await;
    let other = seed_post(&app).await;

    app.comments.create_comment(&first.id, new_comment("on first")).await.unwrap();
    app.settle().await;

    let page = app
        .comments
        .get_post_comments(&other.id, PageRequest::first())
        .await
        .unwrap();
    assert!(page.is_empty());
    app.settle().await;

    let other_scope = PaginationScope::PostComments(other.id.clone());
    let other_v0 = app.cache.comment_pages().version(&other_scope).await;

    app.comments.create_comment(&first.id, new_comment("again")).await.unwrap();
    app.settle().await;

    assert_eq!(app.cache.comment_pages().version(&other_scope).await, other_v0);
}

#[tokio::test]
async fn test_comment_on_missing_post_is_not_found() {
    let app = TestApp::new();
    let err = app
        .comments
        .create_comment(&PostId::from("missing"), new_comment("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, EchoesError::NotFound { .. }));
}

#[tokio::test]
async fn test_invalid_comment_is_rejected() {
    let app = TestApp::new();
    let post = seed_post(&app).await;

    let request = CreateCommentRequest::new("Ann", "nope", "hi");
    let err = app.comments.create_comment(&post.id, request).await.unwrap_err();
    assert!(matches!(err, EchoesError::Validation(_)));
}

#[tokio::test]
async fn test_comment_write_drops_post_snapshot() {
    let app = TestApp::new();
    let post = seed_post(&app).await;
    assert!(app.cache.posts().get(&post.id).await.is_some());

    app.comments.create_comment(&post.id, new_comment("hi")).await.unwrap();
    app.settle().await;

    assert!(app.cache.posts().get(&post.id).await.is_none());
    let fresh = app.posts.get_post(&post.id).await.unwrap();
    assert_eq!(fresh.comments, 1);
}

#[tokio::test]
async fn test_comment_write_refreshes_post_listing_counts() {
    let app = TestApp::new();
    let post = seed_post(&app).await;
    let before = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(before.items[0].comments, 0);
    app.settle().await;
    let listing_version = app.cache.post_pages().version(&PaginationScope::Posts).await;

    let comment = app.comments.create_comment(&post.id, new_comment("hi")).await.unwrap();
    app.settle().await;

    assert!(app.cache.post_pages().version(&PaginationScope::Posts).await > listing_version);
    let after = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(after.items[0].comments, 1);
    app.settle().await;

    app.comments.delete_comment(&comment.id).await.unwrap();
    app.settle().await;
    let after_delete = app.posts.get_posts_page(PageRequest::first()).await.unwrap();
    assert_eq!(after_delete.items[0].comments, 0);
}

#[tokio::test]
async fn test_comment_read_through_and_hit() {
    let app = TestApp::new();
    let post = seed_post(&app).await;
    let comment = app.comments.create_comment(&post.id, new_comment("hi")).await.unwrap();
    app.settle().await;
    app.cache.comments().delete(&comment.id).await;

    let reads = app.db.entity_reads();
    assert_eq!(app.comments.get_comment(&comment.id).await.unwrap(), comment);
    assert_eq!(app.db.entity_reads(), reads + 1);
    app.settle().await;

    assert_eq!(app.comments.get_comment(&comment.id).await.unwrap(), comment);
    assert_eq!(app.db.entity_reads(), reads + 1);
}

#[tokio::test]
async fn test_delete_comment_evicts_and_counts() {
    let app = TestApp::new();
    let post = seed_post(&app).await;
    let keep = app.comments.create_comment(&post.id, new_comment("keep")).await.unwrap();
    let gone = app.comments.create_comment(&post.id, new_comment("drop")).await.unwrap();
    app.settle().await;

    assert_eq!(app.comments.comments_count(&post.id).await.unwrap(), 2);

    app.comments.delete_comment(&gone.id).await.unwrap();
    app.settle().await;

    assert_eq!(app.comments.comments_count(&post.id).await.unwrap(), 1);
    assert!(app.cache.comments().get(&gone.id).await.is_none());
    assert!(app.cache.comments().get(&keep.id).await.is_some());

    let page = app
        .comments
        .get_post_comments(&post.id, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(page.items, vec![keep]);
}

#[tokio::test]
async fn test_delete_missing_comment_is_not_found() {
    let app = TestApp::new();
    let err = app
        .comments
        .delete_comment(&CommentId::from("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, EchoesError::NotFound { .. }));
}

#[tokio::test]
async fn test_comments_survive_cache_outage() {
    let app = TestApp::new();
    let post = seed_post(&app).await;
    app.store.set_failing(true);

    let comment = app.comments.create_comment(&post.id, new_comment("hi")).await.unwrap();
    let page = app
        .comments
        .get_post_comments(&post.id, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(page.items, vec![comment]);
    app.settle().await;
}
