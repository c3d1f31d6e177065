//! Versioned pagination cache.
//!
//! Every paginated result set belongs to a [`PaginationScope`] that owns one
//! [`VersionToken`]. Pages are stored under `(scope, version, page)` and never
//! deleted: invalidating a scope mints a new token, which makes every page
//! cached under the old one unreachable until it ages out.

use crate::metrics::CacheMetrics;
use crate::{CacheError, CacheKeys, KeyValueStore, PaginationScope, VersionToken};
use echoes_core::{PageRequest, PageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CACHE_NAME: &str = "pagination";

/// Outcome of a page lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLookup<T> {
    /// The page was cached under the current version.
    Hit(PageResult<T>),
    /// Nothing usable is cached. Carries the version the lookup resolved, so
    /// the caller can compute the page as of that version and store it there.
    Miss(VersionToken),
}

impl<T> PageLookup<T> {
    #[must_use]
    pub fn into_hit(self) -> Option<PageResult<T>> {
        match self {
            Self::Hit(page) => Some(page),
            Self::Miss(_) => None,
        }
    }

    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Cache of paginated result sets, invalidated by version rotation.
pub struct VersionedPaginationCache<T> {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeys,
    version_ttl: Duration,
    page_ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for VersionedPaginationCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            version_ttl: self.version_ttl,
            page_ttl: self.page_ttl,
            _marker: PhantomData,
        }
    }
}

impl<T> VersionedPaginationCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, keys: CacheKeys, version_ttl: Duration, page_ttl: Duration) -> Self {
        Self {
            store,
            keys,
            version_ttl,
            page_ttl,
            _marker: PhantomData,
        }
    }

    /// Returns the current version of `scope`, minting one if none is stored.
    ///
    /// Never fails: if the store is unreachable a fresh token is returned
    /// without being persisted, which reads as a miss everywhere.
    pub async fn version(&self, scope: &PaginationScope) -> VersionToken {
        let key = self.keys.version(scope);

        match self.store.get(&key).await {
            Ok(Some(raw)) => match raw.parse::<VersionToken>() {
                Ok(version) => return version,
                Err(e) => {
                    let e = CacheError::Corrupt {
                        key: key.clone(),
                        reason: e.to_string(),
                    };
                    warn!(class = e.class(), error = %e, "Unreadable pagination version, replacing it");
                    CacheMetrics::error(CACHE_NAME, e.class());
                    return self.overwrite(scope, &key).await;
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to read pagination version");
                CacheMetrics::error(CACHE_NAME, e.class());
                return VersionToken::mint();
            }
        }

        let candidate = VersionToken::mint();
        match self.store.set_nx(&key, &candidate.to_string(), self.version_ttl).await {
            Ok(true) => {
                debug!(scope = %scope, version = %candidate, "Minted pagination version");
                candidate
            }
            // Another reader minted first; converge on its token.
            Ok(false) => match self.store.get(&key).await {
                Ok(Some(raw)) => raw.parse().unwrap_or(candidate),
                _ => candidate,
            },
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to store pagination version");
                CacheMetrics::error(CACHE_NAME, e.class());
                candidate
            }
        }
    }

    /// Looks up one page under the current version of `scope`.
    pub async fn get_page(&self, scope: &PaginationScope, request: PageRequest) -> PageLookup<T> {
        let version = self.version(scope).await;
        let key = self.keys.page(scope, version, request);

        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<PageResult<T>>(&raw) {
                Ok(page) => {
                    debug!(key = %key, "Page cache hit");
                    CacheMetrics::hit(CACHE_NAME);
                    return PageLookup::Hit(page);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Undecodable cached page");
                    CacheMetrics::error(CACHE_NAME, "serialization");
                }
            },
            Ok(None) => debug!(key = %key, "Page cache miss"),
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to read cached page");
                CacheMetrics::error(CACHE_NAME, e.class());
            }
        }

        CacheMetrics::miss(CACHE_NAME);
        PageLookup::Miss(version)
    }

    /// Stores a page under the current version of `scope`.
    pub async fn put_page(&self, scope: &PaginationScope, request: PageRequest, page: &PageResult<T>) {
        let version = self.version(scope).await;
        self.put_page_at(scope, version, request, page).await;
    }

    /// Stores a page under an explicit version.
    ///
    /// Pages are immutable once cached: an existing entry is left untouched.
    pub async fn put_page_at(
        &self,
        scope: &PaginationScope,
        version: VersionToken,
        request: PageRequest,
        page: &PageResult<T>,
    ) {
        let key = self.keys.page(scope, version, request);

        let json = match serde_json::to_string(page) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode page");
                CacheMetrics::error(CACHE_NAME, "serialization");
                return;
            }
        };

        match self.store.set_nx(&key, &json, self.page_ttl).await {
            Ok(true) => debug!(key = %key, items = page.items.len(), "Cached page"),
            Ok(false) => debug!(key = %key, "Page already cached"),
            Err(e) => {
                warn!(key = %key, class = e.class(), error = %e, "Failed to cache page");
                CacheMetrics::error(CACHE_NAME, e.class());
            }
        }
    }

    /// Rotates the version of `scope`, hiding every page cached so far.
    ///
    /// Returns the new token. No page key is touched.
    pub async fn invalidate(&self, scope: &PaginationScope) -> VersionToken {
        let key = self.keys.version(scope);
        let version = self.overwrite(scope, &key).await;
        info!(scope = %scope, version = %version, "Rotated pagination version");
        CacheMetrics::rotation(scope.kind());
        version
    }

    async fn overwrite(&self, scope: &PaginationScope, key: &str) -> VersionToken {
        let version = VersionToken::mint();
        if let Err(e) = self
            .store
            .set(key, &version.to_string(), Some(self.version_ttl))
            .await
        {
            warn!(scope = %scope, class = e.class(), error = %e, "Failed to store pagination version");
            CacheMetrics::error(CACHE_NAME, e.class());
        }
        version
    }
}
