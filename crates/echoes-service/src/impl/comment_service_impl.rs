//! Cache-aside comment service.

use crate::background::BackgroundTasks;
use crate::cache_layer::{CacheLayer, TaskBudgets};
use crate::comment_service::CommentService;
use crate::dto::CreateCommentRequest;
use async_trait::async_trait;
use echoes_cache::{EntityCache, PageLookup, PaginationScope, VersionToken, VersionedPaginationCache};
use echoes_core::{
    Comment, CommentId, EchoesError, EchoesResult, PageRequest, PageResult, Post, PostId, ValidateExt,
};
use echoes_repository::{CommentRepository, PostRepository};
use std::sync::Arc;
use tracing::{debug, info};

/// Comment service reading through the cache and writing through the
/// repository.
///
/// A comment write also drops the owning post's snapshot and rotates the post
/// listings, since both carry the post's comment counter.
pub struct CommentServiceImpl {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    pages: VersionedPaginationCache<Comment>,
    post_pages: VersionedPaginationCache<Post>,
    entities: EntityCache<Comment>,
    post_entities: EntityCache<Post>,
    tasks: BackgroundTasks,
    budgets: TaskBudgets,
}

impl CommentServiceImpl {
    /// Creates a new comment service.
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>, cache: &CacheLayer) -> Self {
        Self {
            comments,
            posts,
            pages: cache.comment_pages(),
            post_pages: cache.post_pages(),
            entities: cache.comments(),
            post_entities: cache.posts(),
            tasks: cache.tasks().clone(),
            budgets: cache.budgets(),
        }
    }

    fn refresh_after_write(&self, task: &'static str, comment: &Comment, deleted: bool) {
        let entities = self.entities.clone();
        let pages = self.pages.clone();
        let post_pages = self.post_pages.clone();
        let post_entities = self.post_entities.clone();
        let comment = comment.clone();
        self.tasks.spawn(task, self.budgets.invalidate, async move {
            if deleted {
                entities.delete(&comment.id).await;
            } else {
                entities.put(&comment).await;
            }
            pages
                .invalidate(&PaginationScope::PostComments(comment.post_id.clone()))
                .await;
            post_entities.delete(&comment.post_id).await;
            post_pages.invalidate(&PaginationScope::Posts).await;
        });
    }
}

#[async_trait]
impl CommentService for CommentServiceImpl {
    async fn get_post_comments(&self, post_id: &PostId, page: PageRequest) -> EchoesResult<PageResult<Comment>> {
        let scope = PaginationScope::PostComments(post_id.clone());

        let version = match self.pages.get_page(&scope, page).await {
            PageLookup::Hit(result) => {
                debug!(post_id = %post_id, page = page.page, "Comments page served from cache");
                return Ok(result);
            }
            PageLookup::Miss(version) => version,
        };

        let result = self
            .comments
            .page_as_of(post_id, version.minted_at(), page)
            .await?;

        let pages = self.pages.clone();
        let entities = self.entities.clone();
        let snapshot = result.clone();
        self.tasks.spawn("populate_comments_page", self.budgets.populate, async move {
            pages.put_page_at(&scope, version, page, &snapshot).await;
            entities.put_many(&snapshot.items).await;
        });

        Ok(result)
    }

    async fn get_comment(&self, id: &CommentId) -> EchoesResult<Comment> {
        if let Some(comment) = self.entities.get(id).await {
            return Ok(comment);
        }

        let comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Comment", id))?;

        let entities = self.entities.clone();
        let snapshot = comment.clone();
        self.tasks.spawn("populate_comment", self.budgets.populate, async move {
            entities.put(&snapshot).await;
        });

        Ok(comment)
    }

    async fn comments_count(&self, post_id: &PostId) -> EchoesResult<u64> {
        self.comments.count_for_post(post_id).await
    }

    async fn create_comment(&self, post_id: &PostId, request: CreateCommentRequest) -> EchoesResult<Comment> {
        let request = request.trimmed();
        request.validate_request()?;

        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(EchoesError::not_found("Post", post_id));
        }

        let comment = Comment::new(post_id.clone(), request.name, request.email, request.content);
        let comment = self.comments.create(&comment).await?;

        info!(comment_id = %comment.id, post_id = %post_id, "Comment created");
        self.refresh_after_write("refresh_created_comment", &comment, false);
        Ok(comment)
    }

    async fn delete_comment(&self, id: &CommentId) -> EchoesResult<Comment> {
        let comment = self
            .comments
            .delete(id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Comment", id))?;

        info!(comment_id = %comment.id, post_id = %comment.post_id, "Comment deleted");
        self.refresh_after_write("evict_deleted_comment", &comment, true);
        Ok(comment)
    }

    async fn invalidate_pagination(&self, post_id: &PostId) -> VersionToken {
        self.pages
            .invalidate(&PaginationScope::PostComments(post_id.clone()))
            .await
    }
}
