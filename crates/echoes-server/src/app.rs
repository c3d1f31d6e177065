//! Application wiring.

use echoes_cache::{KeyValueStore, MemoryStore, RedisStore};
use echoes_config::{AppConfig, RedisConfig};
use echoes_core::EchoesResult;
use echoes_repository::{
    AnnounceRepository, CommentRepository, DatabasePool, LinkRepository, MemoryDatabase, PgAnnounceRepository,
    PgCommentRepository, PgLinkRepository, PgPostRepository, PostRepository,
};
use echoes_service::{
    AnnounceService, AnnounceServiceImpl, CacheLayer, CommentService, CommentServiceImpl, LinkService,
    LinkServiceImpl, PostService, PostServiceImpl,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the source of truth and the cache live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// Postgres and Redis, as configured.
    #[default]
    External,
    /// In-process repositories and cache store.
    InMemory,
}

struct Repositories {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    links: Arc<dyn LinkRepository>,
    announce: Arc<dyn AnnounceRepository>,
}

impl Repositories {
    fn postgres(pool: &Arc<DatabasePool>) -> Self {
        Self {
            posts: Arc::new(PgPostRepository::new(Arc::clone(pool))),
            comments: Arc::new(PgCommentRepository::new(Arc::clone(pool))),
            links: Arc::new(PgLinkRepository::new(Arc::clone(pool))),
            announce: Arc::new(PgAnnounceRepository::new(Arc::clone(pool))),
        }
    }

    fn in_memory() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        Self {
            posts: db.clone(),
            comments: db.clone(),
            links: db.clone(),
            announce: db,
        }
    }
}

/// Connects the cache store, falling back to a disabled store so the
/// application keeps serving from the database.
async fn connect_cache(config: &RedisConfig) -> Arc<dyn KeyValueStore> {
    if !config.enabled {
        info!("Redis disabled, every read goes to the database");
        return Arc::new(RedisStore::disabled());
    }

    match echoes_cache::create_pool(config).await {
        Ok(pool) => Arc::new(RedisStore::new(Arc::new(pool))),
        Err(e) => {
            warn!(url = %config.url, error = %e, "Redis unavailable, running with the cache disabled");
            Arc::new(RedisStore::disabled())
        }
    }
}

/// The wired services and the resources they hold.
pub struct Application {
    pub config: AppConfig,
    pub cache: CacheLayer,
    pub posts: Arc<dyn PostService>,
    pub comments: Arc<dyn CommentService>,
    pub links: Arc<dyn LinkService>,
    pub announce: Arc<dyn AnnounceService>,
    database: Option<Arc<DatabasePool>>,
}

impl Application {
    /// Waits for in-flight cache tasks, then closes the database pool.
    ///
    /// Cache tasks still running after the invalidation budget are abandoned;
    /// their entries age out through their TTLs.
    pub async fn shutdown(&self) {
        let budget = self.cache.budgets().invalidate;
        if tokio::time::timeout(budget, self.cache.tasks().wait_idle()).await.is_err() {
            warn!(
                in_flight = self.cache.tasks().in_flight(),
                "Abandoning cache tasks still running at shutdown"
            );
        }

        if let Some(database) = &self.database {
            database.close().await;
        }

        info!("Application resources released");
    }
}

/// Application builder for constructing the server.
pub struct AppBuilder {
    config: Option<AppConfig>,
    storage: StorageMode,
}

impl AppBuilder {
    /// Creates a new application builder.
    pub fn new() -> Self {
        Self {
            config: None,
            storage: StorageMode::default(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets where data and cache entries are kept.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageMode) -> Self {
        self.storage = storage;
        self
    }

    /// Connects storage and wires every service.
    pub async fn build(self) -> EchoesResult<Application> {
        let config = self.config.unwrap_or_default();

        let (repositories, store, database) = match self.storage {
            StorageMode::External => {
                let pool = echoes_repository::create_pool(&config.database).await?;
                let store = connect_cache(&config.redis).await;
                (Repositories::postgres(&pool), store, Some(pool))
            }
            StorageMode::InMemory => {
                info!("Using in-memory storage");
                let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
                (Repositories::in_memory(), store, None)
            }
        };

        let cache = CacheLayer::new(store, &config.cache);

        let posts: Arc<dyn PostService> = Arc::new(PostServiceImpl::new(repositories.posts.clone(), &cache));
        let comments: Arc<dyn CommentService> = Arc::new(CommentServiceImpl::new(
            repositories.comments,
            repositories.posts,
            &cache,
        ));
        let links: Arc<dyn LinkService> = Arc::new(LinkServiceImpl::new(repositories.links, &cache));
        let announce: Arc<dyn AnnounceService> =
            Arc::new(AnnounceServiceImpl::new(repositories.announce, &cache));

        info!(
            storage = ?self.storage,
            cache_enabled = cache.store().is_enabled(),
            background_tasks = cache.tasks().capacity(),
            "Application wired"
        );

        Ok(Application {
            config,
            cache,
            posts,
            comments,
            links,
            announce,
            database,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
