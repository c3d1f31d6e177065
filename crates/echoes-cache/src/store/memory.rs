//! In-process key-value store.
//!
//! Mirrors the Redis semantics the cache layer relies on: per-key TTLs,
//! `WRONGTYPE` failures when a key holds another kind of value, sorted sets
//! ordered by score then member, and empty hashes or sets disappearing.
//! Batches are applied to a staged copy and swapped in only if every
//! operation succeeds.

use super::{Batch, BatchOp, KeyValueStore};
use crate::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Expired keys are only dropped on access; a full sweep runs after this many
/// writes and before every batch.
const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    ZSet(Vec<(f64, String)>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default, Clone)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    writes: usize,
}

impl Keyspace {
    fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_live(now));
        self.writes = 0;
    }

    fn note_write(&mut self, now: Instant) {
        self.writes += 1;
        if self.writes >= SWEEP_INTERVAL {
            self.sweep(now);
        }
    }

    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.entries.get(key).is_some_and(|e| !e.is_live(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn get_str(&mut self, key: &str, now: Instant) -> CacheResult<Option<String>> {
        match self.live(key, now) {
            None => Ok(None),
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    fn set_str(&mut self, key: &str, value: &str, ttl: Option<Duration>, now: Instant) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
    }

    fn delete(&mut self, keys: &[String], now: Instant) -> u64 {
        let mut removed = 0;
        for key in keys {
            if self.live(key, now).is_some() {
                self.entries.remove(key);
                removed += 1;
            }
        }
        removed
    }

    fn expire(&mut self, key: &str, ttl: Duration, now: Instant) -> bool {
        match self.live(key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                true
            }
            None => false,
        }
    }

    fn hash_mut(&mut self, key: &str, now: Instant) -> CacheResult<&mut HashMap<String, String>> {
        if self.live(key, now).is_none() {
            self.entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Hash(HashMap::new()),
                    expires_at: None,
                },
            );
        }
        match self.entries.get_mut(key) {
            Some(Entry { value: Value::Hash(map), .. }) => Ok(map),
            _ => Err(CacheError::WrongType(key.to_string())),
        }
    }

    fn hash(&mut self, key: &str, now: Instant) -> CacheResult<Option<&HashMap<String, String>>> {
        match self.live(key, now) {
            None => Ok(None),
            Some(Entry { value: Value::Hash(map), .. }) => Ok(Some(&*map)),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    fn hset(&mut self, key: &str, fields: &[(String, String)], now: Instant) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let map = self.hash_mut(key, now)?;
        for (field, value) in fields {
            map.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    fn zset_mut(&mut self, key: &str, now: Instant) -> CacheResult<&mut Vec<(f64, String)>> {
        if self.live(key, now).is_none() {
            self.entries.insert(
                key.to_string(),
                Entry {
                    value: Value::ZSet(Vec::new()),
                    expires_at: None,
                },
            );
        }
        match self.entries.get_mut(key) {
            Some(Entry { value: Value::ZSet(set), .. }) => Ok(set),
            _ => Err(CacheError::WrongType(key.to_string())),
        }
    }

    fn zset(&mut self, key: &str, now: Instant) -> CacheResult<Option<&Vec<(f64, String)>>> {
        match self.live(key, now) {
            None => Ok(None),
            Some(Entry { value: Value::ZSet(set), .. }) => Ok(Some(&*set)),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    fn zadd(&mut self, key: &str, members: &[(f64, String)], now: Instant) -> CacheResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let set = self.zset_mut(key, now)?;
        for (score, member) in members {
            match set.iter_mut().find(|(_, m)| m == member) {
                Some(existing) => existing.0 = *score,
                None => set.push((*score, member.clone())),
            }
        }
        set.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(())
    }

    fn zrem(&mut self, key: &str, members: &[String], now: Instant) -> CacheResult<u64> {
        let Some(Entry { value, .. }) = self.live(key, now) else {
            return Ok(0);
        };
        let Value::ZSet(set) = value else {
            return Err(CacheError::WrongType(key.to_string()));
        };
        let before = set.len();
        set.retain(|(_, m)| !members.contains(m));
        let removed = (before - set.len()) as u64;
        if set.is_empty() {
            self.entries.remove(key);
        }
        Ok(removed)
    }

    fn apply(&mut self, op: &BatchOp, now: Instant) -> CacheResult<()> {
        match op {
            BatchOp::Set { key, value, ttl } => self.set_str(key, value, *ttl, now),
            BatchOp::Delete { keys } => {
                self.delete(keys, now);
            }
            BatchOp::HSet { key, fields } => self.hset(key, fields, now)?,
            BatchOp::Expire { key, ttl } => {
                self.expire(key, *ttl, now);
            }
            BatchOp::ZAdd { key, members } => self.zadd(key, members, now)?,
            BatchOp::ZRem { key, members } => {
                self.zrem(key, members, now)?;
            }
        }
        Ok(())
    }
}

/// In-memory [`KeyValueStore`] for tests and single-node deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Keyspace>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of a key, `None` if absent or persistent.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        keyspace
            .live(key, now)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Live keys starting with `prefix`, sorted.
    #[must_use]
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .inner
            .lock()
            .entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.inner.lock().get_str(key, Instant::now())
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        // MGET reports keys of another type as absent.
        Ok(keys
            .iter()
            .map(|key| keyspace.get_str(key, now).ok().flatten())
            .collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        keyspace.set_str(key, value, ttl, now);
        keyspace.note_write(now);
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        if keyspace.live(key, now).is_some() {
            return Ok(false);
        }
        keyspace.set_str(key, value, Some(ttl), now);
        keyspace.note_write(now);
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        Ok(self.inner.lock().delete(keys, Instant::now()))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.inner.lock().live(key, Instant::now()).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        Ok(self.inner.lock().expire(key, ttl, Instant::now()))
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        let mut keyspace = self.inner.lock();
        Ok(keyspace
            .hash(key, Instant::now())?
            .and_then(|map| map.get(field).cloned()))
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        keyspace.hset(key, fields, now)?;
        keyspace.note_write(now);
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut keyspace = self.inner.lock();
        Ok(keyspace.hash(key, Instant::now())?.cloned().unwrap_or_default())
    }

    async fn zadd(&self, key: &str, members: &[(f64, String)]) -> CacheResult<()> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        keyspace.zadd(key, members, now)?;
        keyspace.note_write(now);
        Ok(())
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        let mut keyspace = self.inner.lock();
        let Some(set) = keyspace.zset(key, Instant::now())? else {
            return Ok(Vec::new());
        };

        #[allow(clippy::cast_possible_wrap)]
        let len = set.len() as isize;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        #[allow(clippy::cast_sign_loss)]
        let range = start as usize..=stop as usize;
        Ok(set[range].iter().map(|(_, member)| member.clone()).collect())
    }

    async fn zrem(&self, key: &str, members: &[String]) -> CacheResult<u64> {
        self.inner.lock().zrem(key, members, Instant::now())
    }

    async fn zscore(&self, key: &str, member: &str) -> CacheResult<Option<f64>> {
        let mut keyspace = self.inner.lock();
        Ok(keyspace
            .zset(key, Instant::now())?
            .and_then(|set| set.iter().find(|(_, m)| m == member).map(|(score, _)| *score)))
    }

    async fn exec(&self, batch: Batch) -> CacheResult<()> {
        let now = Instant::now();
        let mut keyspace = self.inner.lock();
        keyspace.sweep(now);
        let mut staged = keyspace.clone();
        for op in batch.ops() {
            staged.apply(op, now)?;
        }
        *keyspace = staged;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}
