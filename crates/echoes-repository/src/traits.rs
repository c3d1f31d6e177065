//! Repository trait definitions.
//!
//! The repositories are the source of truth. Paged reads take a cutoff so a
//! page can be computed "as of" a point in time: rows created after the
//! cutoff are left out, which keeps repeated computations for one cache
//! version in agreement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_core::{
    Announce, Comment, CommentId, EchoesResult, Link, LinkId, PageRequest, PageResult, Post, PostId,
};

/// Post repository trait.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Finds a post by ID, with its comment count.
    async fn find_by_id(&self, id: &PostId) -> EchoesResult<Option<Post>>;

    /// Saves a new post.
    async fn create(&self, post: &Post) -> EchoesResult<Post>;

    /// Updates an existing post. Fails with `NotFound` if it does not exist.
    async fn update(&self, post: &Post) -> EchoesResult<Post>;

    /// Deletes a post and its comments, returning the deleted post.
    async fn delete(&self, id: &PostId) -> EchoesResult<Option<Post>>;

    /// Lists posts created at or before `cutoff`, pinned first, newest first.
    async fn page_as_of(&self, cutoff: DateTime<Utc>, page: PageRequest) -> EchoesResult<PageResult<Post>>;
}

/// Comment repository trait.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Finds a comment by ID.
    async fn find_by_id(&self, id: &CommentId) -> EchoesResult<Option<Comment>>;

    /// Saves a new comment.
    async fn create(&self, comment: &Comment) -> EchoesResult<Comment>;

    /// Deletes a comment, returning it.
    async fn delete(&self, id: &CommentId) -> EchoesResult<Option<Comment>>;

    /// Lists a post's comments created at or before `cutoff`, newest first.
    async fn page_as_of(
        &self,
        post_id: &PostId,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> EchoesResult<PageResult<Comment>>;

    /// Counts the comments under a post.
    async fn count_for_post(&self, post_id: &PostId) -> EchoesResult<u64>;
}

/// Link repository trait.
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Lists every link in display order.
    async fn find_all(&self) -> EchoesResult<Vec<Link>>;

    async fn find_by_id(&self, id: &LinkId) -> EchoesResult<Option<Link>>;

    async fn create(&self, link: &Link) -> EchoesResult<Link>;

    async fn delete(&self, id: &LinkId) -> EchoesResult<Option<Link>>;
}

/// Announcement repository trait.
#[async_trait]
pub trait AnnounceRepository: Send + Sync {
    async fn get(&self) -> EchoesResult<Option<Announce>>;

    /// Replaces the announcement.
    async fn set(&self, announce: &Announce) -> EchoesResult<Announce>;

    /// Removes the announcement. Returns whether one existed.
    async fn delete(&self) -> EchoesResult<bool>;
}
