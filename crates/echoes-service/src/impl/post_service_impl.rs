//! Cache-aside post service.

use crate::background::BackgroundTasks;
use crate::cache_layer::{CacheLayer, TaskBudgets};
use crate::dto::{CreatePostRequest, UpdatePostRequest};
use crate::post_service::PostService;
use async_trait::async_trait;
use echoes_cache::{EntityCache, PageLookup, PaginationScope, VersionToken, VersionedPaginationCache};
use echoes_core::{Comment, EchoesError, EchoesResult, PageRequest, PageResult, Post, PostId, ValidateExt};
use echoes_repository::PostRepository;
use std::sync::Arc;
use tracing::{debug, info};

/// Post service reading through the cache and writing through the repository.
pub struct PostServiceImpl {
    repository: Arc<dyn PostRepository>,
    pages: VersionedPaginationCache<Post>,
    entities: EntityCache<Post>,
    comment_pages: VersionedPaginationCache<Comment>,
    tasks: BackgroundTasks,
    budgets: TaskBudgets,
}

impl PostServiceImpl {
    /// Creates a new post service.
    pub fn new(repository: Arc<dyn PostRepository>, cache: &CacheLayer) -> Self {
        Self {
            repository,
            pages: cache.post_pages(),
            entities: cache.posts(),
            comment_pages: cache.comment_pages(),
            tasks: cache.tasks().clone(),
            budgets: cache.budgets(),
        }
    }

    /// Refreshes the post snapshot and rotates the listing version.
    fn refresh_after_write(&self, task: &'static str, post: &Post) {
        let entities = self.entities.clone();
        let pages = self.pages.clone();
        let post = post.clone();
        self.tasks.spawn(task, self.budgets.invalidate, async move {
            entities.put(&post).await;
            pages.invalidate(&PaginationScope::Posts).await;
        });
    }

    async fn find_existing(&self, id: &PostId) -> EchoesResult<Post> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Post", id))
    }
}

#[async_trait]
impl PostService for PostServiceImpl {
    async fn get_posts_page(&self, page: PageRequest) -> EchoesResult<PageResult<Post>> {
        let scope = PaginationScope::Posts;

        let version = match self.pages.get_page(&scope, page).await {
            PageLookup::Hit(result) => {
                debug!(page = page.page, size = page.size, "Posts page served from cache");
                return Ok(result);
            }
            PageLookup::Miss(version) => version,
        };

        let result = self.repository.page_as_of(version.minted_at(), page).await?;

        let pages = self.pages.clone();
        let entities = self.entities.clone();
        let snapshot = result.clone();
        self.tasks.spawn("populate_posts_page", self.budgets.populate, async move {
            pages.put_page_at(&scope, version, page, &snapshot).await;
            entities.put_many(&snapshot.items).await;
        });

        Ok(result)
    }

    async fn get_post(&self, id: &PostId) -> EchoesResult<Post> {
        if let Some(post) = self.entities.get(id).await {
            return Ok(post);
        }

        let post = self.find_existing(id).await?;

        let entities = self.entities.clone();
        let snapshot = post.clone();
        self.tasks.spawn("populate_post", self.budgets.populate, async move {
            entities.put(&snapshot).await;
        });

        Ok(post)
    }

    async fn create_post(&self, request: CreatePostRequest) -> EchoesResult<Post> {
        let request = request.trimmed();
        request.validate_request()?;

        let post = Post::new(request.title, request.content, request.tweet);
        let post = self.repository.create(&post).await?;

        info!(post_id = %post.id, "Post created");
        self.refresh_after_write("refresh_created_post", &post);
        Ok(post)
    }

    async fn update_post(&self, id: &PostId, request: UpdatePostRequest) -> EchoesResult<Post> {
        let request = request.trimmed();
        request.validate_request()?;

        let mut post = self.find_existing(id).await?;
        post.title = request.title;
        post.content = request.content;
        post.tweet = request.tweet;
        let post = self.repository.update(&post).await?;

        info!(post_id = %post.id, "Post updated");
        self.refresh_after_write("refresh_updated_post", &post);
        Ok(post)
    }

    async fn delete_post(&self, id: &PostId) -> EchoesResult<Post> {
        let post = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Post", id))?;

        info!(post_id = %post.id, "Post deleted");

        let entities = self.entities.clone();
        let pages = self.pages.clone();
        let comment_pages = self.comment_pages.clone();
        let id = id.clone();
        self.tasks.spawn("evict_deleted_post", self.budgets.invalidate, async move {
            entities.delete(&id).await;
            pages.invalidate(&PaginationScope::Posts).await;
            comment_pages.invalidate(&PaginationScope::PostComments(id)).await;
        });

        Ok(post)
    }

    async fn pin_post(&self, id: &PostId) -> EchoesResult<Post> {
        let mut post = self.find_existing(id).await?;
        post.pinned = !post.pinned;
        let post = self.repository.update(&post).await?;

        info!(post_id = %post.id, pinned = post.pinned, "Post pin toggled");
        self.refresh_after_write("refresh_pinned_post", &post);
        Ok(post)
    }

    async fn invalidate_pagination(&self) -> VersionToken {
        self.pages.invalidate(&PaginationScope::Posts).await
    }
}
