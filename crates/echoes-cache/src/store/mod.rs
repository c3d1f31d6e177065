//! Key-value store abstraction.
//!
//! The cache components only need a small Redis-shaped surface: strings with a
//! TTL, hashes, sorted sets, a multi-get and an atomic batch. [`RedisStore`]
//! talks to a real server, [`MemoryStore`] keeps everything in-process.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::{create_pool, RedisStore};

use crate::CacheResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Key-value store used by every cache component.
///
/// Implementations report failures as [`crate::CacheError`]; turning those
/// into misses is the caller's job.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Whether the store is switched on. A disabled store reads as empty and
    /// drops writes.
    fn is_enabled(&self) -> bool;

    /// Gets a string value.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Gets several string values, in the order of `keys`.
    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>>;

    /// Sets a string value, optionally with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Sets a string value with a TTL only if the key does not exist.
    ///
    /// Returns `true` if the value was written.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;

    /// Deletes keys. Returns the number of keys that existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// Checks whether a key exists.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Sets the TTL of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Gets one field of a hash.
    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>>;

    /// Sets fields of a hash.
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()>;

    /// Gets every field of a hash. An absent key yields an empty map.
    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    /// Adds `(score, member)` pairs to a sorted set.
    async fn zadd(&self, key: &str, members: &[(f64, String)]) -> CacheResult<()>;

    /// Returns members ranked `start..=stop` in ascending score order.
    /// Negative indexes count from the end, as in Redis.
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>>;

    /// Removes members from a sorted set. Returns the number removed.
    async fn zrem(&self, key: &str, members: &[String]) -> CacheResult<u64>;

    /// Returns the score of a member.
    async fn zscore(&self, key: &str, member: &str) -> CacheResult<Option<f64>>;

    /// Applies every operation of the batch, or none of them.
    async fn exec(&self, batch: Batch) -> CacheResult<()>;

    /// Round-trips to the backend.
    async fn ping(&self) -> CacheResult<()>;
}

/// One write inside a [`Batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    Delete {
        keys: Vec<String>,
    },
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    Expire {
        key: String,
        ttl: Duration,
    },
    ZAdd {
        key: String,
        members: Vec<(f64, String)>,
    },
    ZRem {
        key: String,
        members: Vec<String>,
    },
}

/// An ordered list of writes executed atomically by [`KeyValueStore::exec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) -> &mut Self {
        self.ops.push(BatchOp::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    /// Queues a delete. Empty key lists are skipped.
    pub fn delete(&mut self, keys: Vec<String>) -> &mut Self {
        if !keys.is_empty() {
            self.ops.push(BatchOp::Delete { keys });
        }
        self
    }

    /// Queues a hash write. Empty field lists are skipped.
    pub fn hset(&mut self, key: impl Into<String>, fields: Vec<(String, String)>) -> &mut Self {
        if !fields.is_empty() {
            self.ops.push(BatchOp::HSet {
                key: key.into(),
                fields,
            });
        }
        self
    }

    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> &mut Self {
        self.ops.push(BatchOp::Expire { key: key.into(), ttl });
        self
    }

    /// Queues a sorted-set add. Empty member lists are skipped.
    pub fn zadd(&mut self, key: impl Into<String>, members: Vec<(f64, String)>) -> &mut Self {
        if !members.is_empty() {
            self.ops.push(BatchOp::ZAdd {
                key: key.into(),
                members,
            });
        }
        self
    }

    /// Queues a sorted-set removal. Empty member lists are skipped.
    pub fn zrem(&mut self, key: impl Into<String>, members: Vec<String>) -> &mut Self {
        if !members.is_empty() {
            self.ops.push(BatchOp::ZRem {
                key: key.into(),
                members,
            });
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// TTL in whole seconds, never below one.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
