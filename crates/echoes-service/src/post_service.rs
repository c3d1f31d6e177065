//! Post service trait definition.

use crate::dto::{CreatePostRequest, UpdatePostRequest};
use async_trait::async_trait;
use echoes_cache::VersionToken;
use echoes_core::{EchoesResult, PageRequest, PageResult, Post, PostId};

/// Post service trait.
#[async_trait]
pub trait PostService: Send + Sync {
    /// Gets a page of the post listing.
    async fn get_posts_page(&self, page: PageRequest) -> EchoesResult<PageResult<Post>>;

    /// Gets a post by ID.
    async fn get_post(&self, id: &PostId) -> EchoesResult<Post>;

    /// Creates a new post.
    async fn create_post(&self, request: CreatePostRequest) -> EchoesResult<Post>;

    /// Updates a post's title, content and kind.
    async fn update_post(&self, id: &PostId, request: UpdatePostRequest) -> EchoesResult<Post>;

    /// Deletes a post together with its comments.
    async fn delete_post(&self, id: &PostId) -> EchoesResult<Post>;

    /// Toggles whether a post is pinned to the top of the listing.
    async fn pin_post(&self, id: &PostId) -> EchoesResult<Post>;

    /// Hides every cached page of the post listing.
    async fn invalidate_pagination(&self) -> VersionToken;
}
