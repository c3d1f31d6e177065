//! Comment service trait definition.

use crate::dto::CreateCommentRequest;
use async_trait::async_trait;
use echoes_cache::VersionToken;
use echoes_core::{Comment, CommentId, EchoesResult, PageRequest, PageResult, PostId};

/// Comment service trait.
#[async_trait]
pub trait CommentService: Send + Sync {
    /// Gets a page of a post's comments, newest first.
    async fn get_post_comments(&self, post_id: &PostId, page: PageRequest) -> EchoesResult<PageResult<Comment>>;

    /// Gets a comment by ID.
    async fn get_comment(&self, id: &CommentId) -> EchoesResult<Comment>;

    /// Counts the comments under a post.
    async fn comments_count(&self, post_id: &PostId) -> EchoesResult<u64>;

    /// Leaves a comment under an existing post.
    async fn create_comment(&self, post_id: &PostId, request: CreateCommentRequest) -> EchoesResult<Comment>;

    /// Deletes a comment.
    async fn delete_comment(&self, id: &CommentId) -> EchoesResult<Comment>;

    /// Hides every cached page of a post's comments.
    async fn invalidate_pagination(&self, post_id: &PostId) -> VersionToken;
}
