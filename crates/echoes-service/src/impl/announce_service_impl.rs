//! Cache-aside announcement service.

use crate::announce_service::AnnounceService;
use crate::background::BackgroundTasks;
use crate::cache_layer::{CacheLayer, TaskBudgets};
use crate::dto::CreateAnnounceRequest;
use async_trait::async_trait;
use echoes_cache::AnnounceCache;
use echoes_core::{Announce, EchoesResult, ValidateExt};
use echoes_repository::AnnounceRepository;
use std::sync::Arc;
use tracing::info;

pub struct AnnounceServiceImpl {
    repository: Arc<dyn AnnounceRepository>,
    cache: AnnounceCache,
    tasks: BackgroundTasks,
    budgets: TaskBudgets,
}

impl AnnounceServiceImpl {
    pub fn new(repository: Arc<dyn AnnounceRepository>, cache: &CacheLayer) -> Self {
        Self {
            repository,
            cache: cache.announce(),
            tasks: cache.tasks().clone(),
            budgets: cache.budgets(),
        }
    }
}

#[async_trait]
impl AnnounceService for AnnounceServiceImpl {
    async fn get_announce(&self) -> EchoesResult<Option<Announce>> {
        if let Some(announce) = self.cache.get().await {
            return Ok(Some(announce));
        }

        let announce = self.repository.get().await?;

        if let Some(snapshot) = announce.clone() {
            let cache = self.cache.clone();
            self.tasks.spawn("populate_announce", self.budgets.populate, async move {
                cache.put(&snapshot).await;
            });
        }

        Ok(announce)
    }

    async fn create_announce(&self, request: CreateAnnounceRequest) -> EchoesResult<Announce> {
        let request = request.trimmed();
        request.validate_request()?;

        let announce = self.repository.set(&Announce::new(request.content)).await?;
        info!("Announcement published");

        let cache = self.cache.clone();
        let snapshot = announce.clone();
        self.tasks.spawn("refresh_announce", self.budgets.invalidate, async move {
            cache.put(&snapshot).await;
        });

        Ok(announce)
    }

    async fn delete_announce(&self) -> EchoesResult<bool> {
        let existed = self.repository.delete().await?;
        info!(existed, "Announcement removed");

        let cache = self.cache.clone();
        self.tasks.spawn("evict_announce", self.budgets.invalidate, async move {
            cache.delete().await;
        });

        Ok(existed)
    }
}
