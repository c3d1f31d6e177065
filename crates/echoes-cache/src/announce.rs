//! Announcement cache, stored as one hash.

use crate::metrics::CacheMetrics;
use crate::{Batch, CacheKeys, KeyValueStore};
use chrono::{DateTime, Utc};
use echoes_core::Announce;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CACHE_NAME: &str = "announce";
const FIELD_CONTENT: &str = "content";
const FIELD_DATE: &str = "date";

/// Cache of the single site announcement.
#[derive(Clone)]
pub struct AnnounceCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: Duration,
}

impl AnnounceCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, keys: &CacheKeys, ttl: Duration) -> Self {
        Self {
            store,
            key: keys.announce(),
            ttl,
        }
    }

    pub async fn get(&self) -> Option<Announce> {
        let fields = match self.store.hgetall(&self.key).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(key = %self.key, class = e.class(), error = %e, "Failed to read cached announcement");
                CacheMetrics::error(CACHE_NAME, e.class());
                return None;
            }
        };

        if fields.is_empty() {
            debug!(key = %self.key, "Announcement cache miss");
            CacheMetrics::miss(CACHE_NAME);
            return None;
        }

        let content = fields.get(FIELD_CONTENT);
        let date = fields
            .get(FIELD_DATE)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|date| date.with_timezone(&Utc));

        match (content, date) {
            (Some(content), Some(date)) => {
                CacheMetrics::hit(CACHE_NAME);
                Some(Announce {
                    content: content.clone(),
                    date,
                })
            }
            _ => {
                warn!(key = %self.key, "Incomplete cached announcement");
                CacheMetrics::error(CACHE_NAME, "corrupt");
                None
            }
        }
    }

    /// Overwrites the cached announcement.
    pub async fn put(&self, announce: &Announce) {
        let mut batch = Batch::new();
        batch
            .delete(vec![self.key.clone()])
            .hset(
                self.key.clone(),
                vec![
                    (FIELD_CONTENT.to_string(), announce.content.clone()),
                    (FIELD_DATE.to_string(), announce.date.to_rfc3339()),
                ],
            )
            .expire(self.key.clone(), self.ttl);

        if let Err(e) = self.store.exec(batch).await {
            warn!(key = %self.key, class = e.class(), error = %e, "Failed to cache announcement");
            CacheMetrics::error(CACHE_NAME, e.class());
        }
    }

    pub async fn delete(&self) {
        if let Err(e) = self.store.delete(std::slice::from_ref(&self.key)).await {
            warn!(key = %self.key, class = e.class(), error = %e, "Failed to evict announcement");
            CacheMetrics::error(CACHE_NAME, e.class());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FailingStore;
    use crate::MemoryStore;

    fn cache(store: Arc<dyn KeyValueStore>) -> AnnounceCache {
        AnnounceCache::new(store, &CacheKeys::default(), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone());
        assert!(cache.get().await.is_none());

        let announce = Announce::new("Maintenance tonight");
        cache.put(&announce).await;
        assert_eq!(cache.get().await, Some(announce));
        assert!(store.ttl("echoes:announce").is_some());

        cache.delete().await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_previous() {
        let cache = cache(Arc::new(MemoryStore::new()));
        cache.put(&Announce::new("first")).await;
        cache.put(&Announce::new("second")).await;
        assert_eq!(cache.get().await.unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_incomplete_hash_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone());
        store
            .hset("echoes:announce", &[("content".to_string(), "hi".to_string())])
            .await
            .unwrap();
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_store_failures_are_absorbed() {
        let cache = cache(Arc::new(FailingStore));
        cache.put(&Announce::new("x")).await;
        cache.delete().await;
        assert!(cache.get().await.is_none());
    }
}
