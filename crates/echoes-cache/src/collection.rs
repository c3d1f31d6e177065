//! Ordered collection cache.
//!
//! A small, fully materialized list stored as a sorted set of member keys
//! (scored by position) plus one JSON blob per member. The list is only ever
//! replaced as a whole, in one atomic batch, so the set and the blobs cannot
//! drift apart.

use crate::metrics::CacheMetrics;
use crate::{Batch, CacheKeys, KeyValueStore};
use echoes_core::Entity;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extra lifetime of member blobs over the sorted set, so a live set never
/// points at an expired blob.
pub const BLOB_TTL_MARGIN: Duration = Duration::from_secs(5);

/// Cache of a small ordered list, rebuilt atomically.
pub struct OrderedCollectionCache<T> {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeys,
    name: &'static str,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for OrderedCollectionCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            name: self.name,
            ttl: self.ttl,
            _marker: PhantomData,
        }
    }
}

impl<T> OrderedCollectionCache<T>
where
    T: Entity + Serialize + DeserializeOwned + Send + Sync,
{
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, keys: CacheKeys, name: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            keys,
            name,
            ttl,
            _marker: PhantomData,
        }
    }

    fn set_key(&self) -> String {
        self.keys.collection(self.name)
    }

    fn member_key(&self, id: &str) -> String {
        self.keys.member(self.name, id)
    }

    /// Returns the cached list in display order.
    ///
    /// A member whose blob is gone or unreadable turns the whole read into a
    /// miss, as does any store failure.
    pub async fn get_all(&self) -> Option<Vec<T>> {
        let set_key = self.set_key();

        match self.store.exists(&set_key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(collection = self.name, "Collection cache miss");
                CacheMetrics::miss(self.name);
                return None;
            }
            Err(e) => {
                self.absorb("check collection", &e);
                return None;
            }
        }

        let members = match self.store.zrange(&set_key, 0, -1).await {
            Ok(members) => members,
            Err(e) => {
                self.absorb("read collection members", &e);
                return None;
            }
        };

        let blobs = match self.store.mget(&members).await {
            Ok(blobs) => blobs,
            Err(e) => {
                self.absorb("read collection blobs", &e);
                return None;
            }
        };

        let mut items = Vec::with_capacity(members.len());
        for (member, blob) in members.iter().zip(blobs) {
            let Some(raw) = blob else {
                warn!(collection = self.name, member = %member, "Collection member without blob");
                CacheMetrics::miss(self.name);
                return None;
            };
            match serde_json::from_str::<T>(&raw) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(collection = self.name, member = %member, error = %e, "Undecodable collection member");
                    CacheMetrics::error(self.name, "serialization");
                    return None;
                }
            }
        }

        CacheMetrics::hit(self.name);
        Some(items)
    }

    /// Replaces the cached list with `items`, in that order.
    ///
    /// The previous set and its blobs are deleted in the same batch. An empty
    /// list leaves nothing cached, since an empty sorted set cannot exist.
    pub async fn replace_all(&self, items: &[T]) {
        let set_key = self.set_key();

        let mut stale = match self.store.zrange(&set_key, 0, -1).await {
            Ok(members) => members,
            Err(e) => {
                self.absorb("read previous collection", &e);
                return;
            }
        };
        stale.push(set_key.clone());

        let mut batch = Batch::new();
        batch.delete(stale);

        let blob_ttl = self.ttl + BLOB_TTL_MARGIN;
        let mut members = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let member = self.member_key(&item.id().to_string());
            let json = match serde_json::to_string(item) {
                Ok(json) => json,
                Err(e) => {
                    warn!(collection = self.name, member = %member, error = %e, "Failed to encode collection member");
                    CacheMetrics::error(self.name, "serialization");
                    return;
                }
            };
            batch.set(member.clone(), json, Some(blob_ttl));
            #[allow(clippy::cast_precision_loss)]
            members.push((position as f64, member));
        }

        if !members.is_empty() {
            batch.zadd(set_key.clone(), members);
            batch.expire(set_key, self.ttl);
        }

        match self.store.exec(batch).await {
            Ok(()) => info!(collection = self.name, items = items.len(), "Rebuilt collection cache"),
            Err(e) => self.absorb("rebuild collection", &e),
        }
    }

    /// Removes one member by rebuilding the list without it.
    pub async fn remove(&self, id: &T::Id) {
        let id = id.to_string();
        let member = self.member_key(&id);

        match self.store.zscore(&self.set_key(), &member).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(collection = self.name, id = %id, "Member not cached, nothing to remove");
                return;
            }
            Err(e) => {
                self.absorb("check collection member", &e);
                return;
            }
        }

        let Some(items) = self.get_all().await else {
            return;
        };
        let remaining: Vec<T> = items.into_iter().filter(|item| item.id().to_string() != id).collect();
        self.replace_all(&remaining).await;
    }

    /// Deletes the cached list and its blobs.
    pub async fn clear(&self) {
        let set_key = self.set_key();
        let mut keys = match self.store.zrange(&set_key, 0, -1).await {
            Ok(members) => members,
            Err(e) => {
                self.absorb("read collection members", &e);
                return;
            }
        };
        keys.push(set_key);

        if let Err(e) = self.store.delete(&keys).await {
            self.absorb("clear collection", &e);
        }
    }

    fn absorb(&self, action: &str, error: &crate::CacheError) {
        warn!(collection = self.name, action, class = error.class(), error = %error, "Collection cache failure");
        CacheMetrics::error(self.name, error.class());
    }
}
