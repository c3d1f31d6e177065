//! Common test infrastructure for the service integration tests.
//!
//! Services run against a [`FlakyStore`] (an in-process store that can be
//! made slow or broken) and a [`RecordingDatabase`] (in-memory repositories
//! that count reads and can be made to fail).

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_cache::{Batch, CacheError, CacheResult, KeyValueStore, MemoryStore};
use echoes_config::CacheConfig;
use echoes_core::{
    Announce, Comment, CommentId, EchoesError, EchoesResult, Link, LinkId, PageRequest, PageResult, Post, PostId,
};
use echoes_repository::{AnnounceRepository, CommentRepository, LinkRepository, MemoryDatabase, PostRepository};
use echoes_service::{AnnounceServiceImpl, CacheLayer, CommentServiceImpl, LinkServiceImpl, PostServiceImpl};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// FlakyStore
// =============================================================================

/// In-process store with switchable latency and failures.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    async fn gate(&self) -> CacheResult<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.gate().await?;
        self.inner.get(key).await
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        self.gate().await?;
        self.inner.mget(keys).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.gate().await?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        self.gate().await?;
        self.inner.set_nx(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        self.gate().await?;
        self.inner.delete(keys).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.gate().await?;
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        self.gate().await?;
        self.inner.expire(key, ttl).await
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        self.gate().await?;
        self.inner.hget(key, field).await
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()> {
        self.gate().await?;
        self.inner.hset(key, fields).await
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        self.gate().await?;
        self.inner.hgetall(key).await
    }

    async fn zadd(&self, key: &str, members: &[(f64, String)]) -> CacheResult<()> {
        self.gate().await?;
        self.inner.zadd(key, members).await
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        self.gate().await?;
        self.inner.zrange(key, start, stop).await
    }

    async fn zrem(&self, key: &str, members: &[String]) -> CacheResult<u64> {
        self.gate().await?;
        self.inner.zrem(key, members).await
    }

    async fn zscore(&self, key: &str, member: &str) -> CacheResult<Option<f64>> {
        self.gate().await?;
        self.inner.zscore(key, member).await
    }

    async fn exec(&self, batch: Batch) -> CacheResult<()> {
        self.gate().await?;
        self.inner.exec(batch).await
    }

    async fn ping(&self) -> CacheResult<()> {
        self.gate().await?;
        self.inner.ping().await
    }
}

// =============================================================================
// RecordingDatabase
// =============================================================================

/// In-memory source of truth counting reads, with a failure switch.
#[derive(Default)]
pub struct RecordingDatabase {
    inner: MemoryDatabase,
    failing: AtomicBool,
    page_reads: AtomicUsize,
    entity_reads: AtomicUsize,
    list_reads: AtomicUsize,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Paged queries served so far.
    pub fn page_reads(&self) -> usize {
        self.page_reads.load(Ordering::SeqCst)
    }

    /// Single-row lookups served so far.
    pub fn entity_reads(&self) -> usize {
        self.entity_reads.load(Ordering::SeqCst)
    }

    /// Full link list loads served so far.
    pub fn list_reads(&self) -> usize {
        self.list_reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> EchoesResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EchoesError::Database("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for RecordingDatabase {
    async fn find_by_id(&self, id: &PostId) -> EchoesResult<Option<Post>> {
        self.check()?;
        self.entity_reads.fetch_add(1, Ordering::SeqCst);
        PostRepository::find_by_id(&self.inner, id).await
    }

    async fn create(&self, post: &Post) -> EchoesResult<Post> {
        self.check()?;
        PostRepository::create(&self.inner, post).await
    }

    async fn update(&self, post: &Post) -> EchoesResult<Post> {
        self.check()?;
        PostRepository::update(&self.inner, post).await
    }

    async fn delete(&self, id: &PostId) -> EchoesResult<Option<Post>> {
        self.check()?;
        PostRepository::delete(&self.inner, id).await
    }

    async fn page_as_of(&self, cutoff: DateTime<Utc>, page: PageRequest) -> EchoesResult<PageResult<Post>> {
        self.check()?;
        self.page_reads.fetch_add(1, Ordering::SeqCst);
        PostRepository::page_as_of(&self.inner, cutoff, page).await
    }
}

#[async_trait]
impl CommentRepository for RecordingDatabase {
    async fn find_by_id(&self, id: &CommentId) -> EchoesResult<Option<Comment>> {
        self.check()?;
        self.entity_reads.fetch_add(1, Ordering::SeqCst);
        CommentRepository::find_by_id(&self.inner, id).await
    }

    async fn create(&self, comment: &Comment) -> EchoesResult<Comment> {
        self.check()?;
        CommentRepository::create(&self.inner, comment).await
    }

    async fn delete(&self, id: &CommentId) -> EchoesResult<Option<Comment>> {
        self.check()?;
        CommentRepository::delete(&self.inner, id).await
    }

    async fn page_as_of(
        &self,
        post_id: &PostId,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> EchoesResult<PageResult<Comment>> {
        self.check()?;
        self.page_reads.fetch_add(1, Ordering::SeqCst);
        CommentRepository::page_as_of(&self.inner, post_id, cutoff, page).await
    }

    async fn count_for_post(&self, post_id: &PostId) -> EchoesResult<u64> {
        self.check()?;
        self.inner.count_for_post(post_id).await
    }
}

#[async_trait]
impl LinkRepository for RecordingDatabase {
    async fn find_all(&self) -> EchoesResult<Vec<Link>> {
        self.check()?;
        self.list_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: &LinkId) -> EchoesResult<Option<Link>> {
        self.check()?;
        self.entity_reads.fetch_add(1, Ordering::SeqCst);
        LinkRepository::find_by_id(&self.inner, id).await
    }

    async fn create(&self, link: &Link) -> EchoesResult<Link> {
        self.check()?;
        LinkRepository::create(&self.inner, link).await
    }

    async fn delete(&self, id: &LinkId) -> EchoesResult<Option<Link>> {
        self.check()?;
        LinkRepository::delete(&self.inner, id).await
    }
}

#[async_trait]
impl AnnounceRepository for RecordingDatabase {
    async fn get(&self) -> EchoesResult<Option<Announce>> {
        self.check()?;
        self.entity_reads.fetch_add(1, Ordering::SeqCst);
        AnnounceRepository::get(&self.inner).await
    }

    async fn set(&self, announce: &Announce) -> EchoesResult<Announce> {
        self.check()?;
        self.inner.set(announce).await
    }

    async fn delete(&self) -> EchoesResult<bool> {
        self.check()?;
        AnnounceRepository::delete(&self.inner).await
    }
}

// =============================================================================
// TestApp
// =============================================================================

/// Every service wired over one flaky store and one recording database.
pub struct TestApp {
    pub store: Arc<FlakyStore>,
    pub db: Arc<RecordingDatabase>,
    pub cache: CacheLayer,
    pub posts: PostServiceImpl,
    pub comments: CommentServiceImpl,
    pub links: LinkServiceImpl,
    pub announce: AnnounceServiceImpl,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        let store = Arc::new(FlakyStore::new());
        let db = Arc::new(RecordingDatabase::new());
        let cache = CacheLayer::new(store.clone(), config);

        Self {
            posts: PostServiceImpl::new(db.clone(), &cache),
            comments: CommentServiceImpl::new(db.clone(), db.clone(), &cache),
            links: LinkServiceImpl::new(db.clone(), &cache),
            announce: AnnounceServiceImpl::new(db.clone(), &cache),
            store,
            db,
            cache,
        }
    }

    /// Waits for every detached cache task to finish.
    pub async fn settle(&self) {
        self.cache.tasks().wait_idle().await;
    }

    /// Cached keys under `{prefix}:{suffix}`.
    pub fn cached_keys(&self, suffix: &str) -> Vec<String> {
        self.store
            .inner()
            .keys(&format!("{}:{}", self.cache.keys().prefix(), suffix))
    }
}
