//! Wiring of cache components for the services.

use crate::background::BackgroundTasks;
use echoes_cache::{
    AnnounceCache, CacheKeys, EntityCache, KeyValueStore, OrderedCollectionCache, VersionedPaginationCache,
};
use echoes_config::CacheConfig;
use echoes_core::{Comment, Link, Post};
use std::sync::Arc;
use std::time::Duration;

/// Entity namespace of cached posts.
pub const POSTS_NAMESPACE: &str = "posts";
/// Entity namespace of cached comments.
pub const COMMENTS_NAMESPACE: &str = "comments";
/// Name of the cached link collection.
pub const LINKS_COLLECTION: &str = "links";

/// Time budgets for detached cache tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskBudgets {
    /// Budget for populating the cache after a miss.
    pub populate: Duration,
    /// Budget for invalidating or refreshing after a write.
    pub invalidate: Duration,
}

impl From<&CacheConfig> for TaskBudgets {
    fn from(config: &CacheConfig) -> Self {
        Self {
            populate: config.populate_timeout(),
            invalidate: config.invalidate_timeout(),
        }
    }
}

/// One shared store, key layout and task executor, handing out typed caches.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeys,
    config: CacheConfig,
    tasks: BackgroundTasks,
}

impl CacheLayer {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            keys: CacheKeys::new(config.key_prefix.clone()),
            config: config.clone(),
            tasks: BackgroundTasks::new(config.max_background_tasks),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    #[must_use]
    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    #[must_use]
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    #[must_use]
    pub fn budgets(&self) -> TaskBudgets {
        TaskBudgets::from(&self.config)
    }

    #[must_use]
    pub fn post_pages(&self) -> VersionedPaginationCache<Post> {
        VersionedPaginationCache::new(
            Arc::clone(&self.store),
            self.keys.clone(),
            self.config.version_ttl(),
            self.config.page_ttl(),
        )
    }

    #[must_use]
    pub fn comment_pages(&self) -> VersionedPaginationCache<Comment> {
        VersionedPaginationCache::new(
            Arc::clone(&self.store),
            self.keys.clone(),
            self.config.version_ttl(),
            self.config.page_ttl(),
        )
    }

    #[must_use]
    pub fn posts(&self) -> EntityCache<Post> {
        EntityCache::new(
            Arc::clone(&self.store),
            self.keys.clone(),
            POSTS_NAMESPACE,
            self.config.post_ttl(),
        )
    }

    #[must_use]
    pub fn comments(&self) -> EntityCache<Comment> {
        EntityCache::new(
            Arc::clone(&self.store),
            self.keys.clone(),
            COMMENTS_NAMESPACE,
            self.config.comment_ttl(),
        )
    }

    #[must_use]
    pub fn links(&self) -> OrderedCollectionCache<Link> {
        OrderedCollectionCache::new(
            Arc::clone(&self.store),
            self.keys.clone(),
            LINKS_COLLECTION,
            self.config.link_ttl(),
        )
    }

    #[must_use]
    pub fn announce(&self) -> AnnounceCache {
        AnnounceCache::new(Arc::clone(&self.store), &self.keys, self.config.announce_ttl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoes_cache::MemoryStore;

    #[test]
    fn test_budgets_from_config() {
        let config = CacheConfig {
            populate_timeout_ms: 250,
            invalidate_timeout_ms: 100,
            ..CacheConfig::default()
        };
        let budgets = TaskBudgets::from(&config);
        assert_eq!(budgets.populate, Duration::from_millis(250));
        assert_eq!(budgets.invalidate, Duration::from_millis(100));
    }

    #[test]
    fn test_layer_uses_configured_prefix_and_capacity() {
        let config = CacheConfig {
            key_prefix: "blog".to_string(),
            max_background_tasks: 8,
            ..CacheConfig::default()
        };
        let layer = CacheLayer::new(Arc::new(MemoryStore::new()), &config);
        assert_eq!(layer.keys().prefix(), "blog");
        assert_eq!(layer.tasks().capacity(), 8);
    }
}
