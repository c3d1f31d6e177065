//! Cache-aside link service.

use crate::background::BackgroundTasks;
use crate::cache_layer::{CacheLayer, TaskBudgets};
use crate::dto::CreateLinkRequest;
use crate::link_service::LinkService;
use async_trait::async_trait;
use echoes_cache::OrderedCollectionCache;
use echoes_core::{EchoesError, EchoesResult, Link, LinkId, ValidateExt};
use echoes_repository::LinkRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Link service keeping the whole ordered link list cached.
pub struct LinkServiceImpl {
    repository: Arc<dyn LinkRepository>,
    links: OrderedCollectionCache<Link>,
    tasks: BackgroundTasks,
    budgets: TaskBudgets,
}

impl LinkServiceImpl {
    /// Creates a new link service.
    pub fn new(repository: Arc<dyn LinkRepository>, cache: &CacheLayer) -> Self {
        Self {
            repository,
            links: cache.links(),
            tasks: cache.tasks().clone(),
            budgets: cache.budgets(),
        }
    }
}

#[async_trait]
impl LinkService for LinkServiceImpl {
    async fn get_links(&self) -> EchoesResult<Vec<Link>> {
        if let Some(links) = self.links.get_all().await {
            debug!(count = links.len(), "Links served from cache");
            return Ok(links);
        }

        let links = self.repository.find_all().await?;

        let cache = self.links.clone();
        let snapshot = links.clone();
        self.tasks.spawn("populate_links", self.budgets.populate, async move {
            cache.replace_all(&snapshot).await;
        });

        Ok(links)
    }

    async fn get_link(&self, id: &LinkId) -> EchoesResult<Link> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Link", id))
    }

    async fn create_link(&self, request: CreateLinkRequest) -> EchoesResult<Link> {
        let request = request.trimmed();
        request.validate_request()?;

        let link = Link::new(request.name, request.url, request.icon, request.place);
        let link = self.repository.create(&link).await?;

        info!(link_id = %link.id, "Link created");

        // The new link's position depends on every other link, so the list is
        // reloaded rather than patched.
        let repository = Arc::clone(&self.repository);
        let cache = self.links.clone();
        self.tasks.spawn("rebuild_links", self.budgets.invalidate, async move {
            match repository.find_all().await {
                Ok(links) => cache.replace_all(&links).await,
                Err(e) => {
                    warn!(error = %e, "Failed to reload links, clearing cached list");
                    cache.clear().await;
                }
            }
        });

        Ok(link)
    }

    async fn delete_link(&self, id: &LinkId) -> EchoesResult<Link> {
        let link = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Link", id))?;

        info!(link_id = %link.id, "Link deleted");

        let cache = self.links.clone();
        let id = id.clone();
        self.tasks.spawn("evict_deleted_link", self.budgets.invalidate, async move {
            cache.remove(&id).await;
        });

        Ok(link)
    }
}
