//! Read-through cache of single entity snapshots.

use crate::metrics::CacheMetrics;
use crate::{Batch, CacheKeys, KeyValueStore};
use echoes_core::Entity;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Caches whole-entity snapshots keyed by id.
///
/// Snapshots are never patched: a mutation re-derives the full entity and
/// overwrites it. Every store failure is logged and swallowed.
pub struct EntityCache<T> {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeys,
    namespace: &'static str,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            namespace: self.namespace,
            ttl: self.ttl,
            _marker: PhantomData,
        }
    }
}

impl<T> EntityCache<T>
where
    T: Entity + Serialize + DeserializeOwned + Send + Sync,
{
    /// Creates a cache storing snapshots under `{prefix}:{namespace}:{id}`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, keys: CacheKeys, namespace: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            keys,
            namespace,
            ttl,
            _marker: PhantomData,
        }
    }

    fn key(&self, id: &T::Id) -> String {
        self.keys.entity(self.namespace, &id.to_string())
    }

    /// Returns the cached snapshot, or `None` on a miss or any failure.
    pub async fn get(&self, id: &T::Id) -> Option<T> {
        let key = self.key(id);

        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(entity) => {
                    CacheMetrics::hit(self.namespace);
                    return Some(entity);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Undecodable cached entity");
                    CacheMetrics::error(self.namespace, "serialization");
                }
            },
            Ok(None) => debug!(key = %key, "Entity cache miss"),
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to read cached entity");
                CacheMetrics::error(self.namespace, e.class());
            }
        }

        CacheMetrics::miss(self.namespace);
        None
    }

    /// Stores a snapshot with the default TTL.
    pub async fn put(&self, entity: &T) {
        self.put_with_ttl(entity, self.ttl).await;
    }

    /// Stores a snapshot with an explicit TTL.
    pub async fn put_with_ttl(&self, entity: &T, ttl: Duration) {
        let key = self.key(entity.id());

        let json = match serde_json::to_string(entity) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode entity");
                CacheMetrics::error(self.namespace, "serialization");
                return;
            }
        };

        match self.store.set(&key, &json, Some(ttl)).await {
            Ok(()) => debug!(key = %key, "Cached entity"),
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to cache entity");
                CacheMetrics::error(self.namespace, e.class());
            }
        }
    }

    /// Stores several snapshots in one batch.
    pub async fn put_many(&self, entities: &[T]) {
        if entities.is_empty() {
            return;
        }

        let mut batch = Batch::new();
        for entity in entities {
            match serde_json::to_string(entity) {
                Ok(json) => {
                    batch.set(self.key(entity.id()), json, Some(self.ttl));
                }
                Err(e) => {
                    warn!(id = %entity.id(), error = %e, "Failed to encode entity");
                    CacheMetrics::error(self.namespace, "serialization");
                }
            }
        }

        if let Err(e) = self.store.exec(batch).await {
            warn!(namespace = self.namespace, class = e.class(), error = %e, "Failed to cache entities");
            CacheMetrics::error(self.namespace, e.class());
        }
    }

    /// Drops a snapshot. Dropping an absent snapshot is not an error.
    pub async fn delete(&self, id: &T::Id) {
        let key = self.key(id);
        match self.store.delete(std::slice::from_ref(&key)).await {
            Ok(removed) => debug!(key = %key, removed, "Evicted entity"),
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to evict entity");
                CacheMetrics::error(self.namespace, e.class());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FailingStore;
    use crate::MemoryStore;
    use echoes_core::{Post, PostId};

    fn cache(store: Arc<dyn KeyValueStore>) -> EntityCache<Post> {
        EntityCache::new(store, CacheKeys::default(), "posts", Duration::from_secs(150))
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone());
        let post = Post::new("Hello", "World", false);

        assert!(cache.get(&post.id).await.is_none());
        cache.put(&post).await;
        assert_eq!(cache.get(&post.id).await, Some(post.clone()));
        assert!(store.ttl(&format!("echoes:posts:{}", post.id)).is_some());

        cache.delete(&post.id).await;
        assert!(cache.get(&post.id).await.is_none());
        cache.delete(&post.id).await;
    }

    #[tokio::test]
    async fn test_put_overwrites_snapshot() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let mut post = Post::new("Hello", "World", false);
        cache.put(&post).await;

        post.pinned = true;
        cache.put(&post).await;
        assert!(cache.get(&post.id).await.unwrap().pinned);
    }

    #[tokio::test]
    async fn test_put_many() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let posts = vec![Post::new("a", "1", false), Post::new("b", "2", true)];
        cache.put_many(&posts).await;
        for post in &posts {
            assert_eq!(cache.get(&post.id).await.as_ref(), Some(post));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_expires() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let post = Post::new("Hello", "World", false);
        cache.put_with_ttl(&post, Duration::from_secs(1)).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&post.id).await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_snapshot_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone());
        store.set("echoes:posts:p1", "[]", None).await.unwrap();
        assert!(cache.get(&PostId::from("p1")).await.is_none());
    }

    #[tokio::test]
    async fn test_store_failures_are_absorbed() {
        let cache = cache(Arc::new(FailingStore));
        let post = Post::new("Hello", "World", false);
        cache.put(&post).await;
        cache.put_many(std::slice::from_ref(&post)).await;
        cache.delete(&post.id).await;
        assert!(cache.get(&post.id).await.is_none());
    }
}
