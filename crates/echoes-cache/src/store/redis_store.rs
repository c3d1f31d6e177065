//! Redis-backed key-value store.

use super::{ttl_secs, Batch, BatchOp, KeyValueStore};
use crate::{CacheError, CacheResult};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use echoes_config::RedisConfig;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Create a Redis connection pool and check that the server answers.
pub async fn create_pool(config: &RedisConfig) -> CacheResult<Pool> {
    info!("Creating Redis connection pool...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| CacheError::Backend(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| CacheError::Backend(format!("Failed to create pool: {e}")))?;

    let mut conn = pool.get().await?;
    let _: String = redis::cmd("PING").query_async(&mut *conn).await?;

    info!("Redis connection pool created successfully");
    Ok(pool)
}

/// Key-value store over a pooled Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    pool: Option<Arc<Pool>>,
}

impl RedisStore {
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create a store that reads as empty and drops writes (for when Redis is
    /// disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => Ok(pool.get().await?),
            None => Err(CacheError::Disabled),
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match &value {
            Some(_) => debug!(key, "Cache hit"),
            None => debug!(key, "Cache miss"),
        }

        Ok(value)
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        if !self.is_enabled() {
            return Ok(vec![None; keys.len()]);
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut *conn).await?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => {
                let secs = ttl_secs(ttl);
                conn.set_ex::<_, _, ()>(key, value, secs).await?;
                debug!(key, ttl_secs = secs, "Cached key");
            }
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let mut conn = self.conn().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut *conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if !self.is_enabled() || keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn().await?;
        let deleted: u64 = conn.del(keys).await?;
        debug!(count = deleted, "Deleted keys");
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let mut conn = self.conn().await?;
        Ok(conn.exists(key).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let mut conn = self.conn().await?;
        #[allow(clippy::cast_possible_wrap)]
        let applied: bool = conn.expire(key, ttl_secs(ttl) as i64).await?;
        Ok(applied)
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let mut conn = self.conn().await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> CacheResult<()> {
        if !self.is_enabled() || fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        if !self.is_enabled() {
            return Ok(HashMap::new());
        }

        let mut conn = self.conn().await?;
        Ok(conn.hgetall(key).await?)
    }

    async fn zadd(&self, key: &str, members: &[(f64, String)]) -> CacheResult<()> {
        if !self.is_enabled() || members.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        conn.zadd_multiple::<_, _, _, ()>(key, members).await?;
        Ok(())
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn().await?;
        Ok(conn.zrange(key, start, stop).await?)
    }

    async fn zrem(&self, key: &str, members: &[String]) -> CacheResult<u64> {
        if !self.is_enabled() || members.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn().await?;
        Ok(conn.zrem(key, members).await?)
    }

    async fn zscore(&self, key: &str, member: &str) -> CacheResult<Option<f64>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let mut conn = self.conn().await?;
        Ok(conn.zscore(key, member).await?)
    }

    async fn exec(&self, batch: Batch) -> CacheResult<()> {
        if !self.is_enabled() || batch.is_empty() {
            return Ok(());
        }

        let ops = batch.len();
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in batch.into_ops() {
            match op {
                BatchOp::Set { key, value, ttl: Some(ttl) } => {
                    pipe.set_ex(key, value, ttl_secs(ttl)).ignore();
                }
                BatchOp::Set { key, value, ttl: None } => {
                    pipe.set(key, value).ignore();
                }
                BatchOp::Delete { keys } => {
                    pipe.del(keys).ignore();
                }
                BatchOp::HSet { key, fields } => {
                    pipe.hset_multiple(key, fields.as_slice()).ignore();
                }
                BatchOp::Expire { key, ttl } => {
                    #[allow(clippy::cast_possible_wrap)]
                    pipe.expire(key, ttl_secs(ttl) as i64).ignore();
                }
                BatchOp::ZAdd { key, members } => {
                    pipe.zadd_multiple(key, members.as_slice()).ignore();
                }
                BatchOp::ZRem { key, members } => {
                    pipe.zrem(key, members).ignore();
                }
            }
        }

        let mut conn = self.conn().await?;
        let _: () = pipe.query_async(&mut *conn).await?;

        debug!(ops, "Executed atomic batch");
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}
