//! # Echoes Cache
//!
//! Cache building blocks layered over a Redis-shaped key-value store:
//!
//! ```text
//! VersionedPaginationCache   paginated lists, invalidated by version rotation
//! EntityCache                whole-entity snapshots keyed by id
//! OrderedCollectionCache     small ordered lists, rebuilt atomically
//! AnnounceCache              the site announcement hash
//!   ↓  Arc<dyn KeyValueStore>
//! RedisStore | MemoryStore
//! ```
//!
//! None of these components ever surface a store failure. Reads degrade to a
//! miss and writes to a logged no-op, so a broken cache only costs latency.

pub mod announce;
pub mod collection;
pub mod entity;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod pagination;
pub mod store;
pub mod version;

pub use announce::AnnounceCache;
pub use collection::OrderedCollectionCache;
pub use entity::EntityCache;
pub use error::*;
pub use keys::{CacheKeys, PaginationScope};
pub use metrics::{register_metrics, CacheMetrics};
pub use pagination::{PageLookup, VersionedPaginationCache};
pub use store::{create_pool, Batch, BatchOp, KeyValueStore, MemoryStore, RedisStore};
pub use version::VersionToken;
