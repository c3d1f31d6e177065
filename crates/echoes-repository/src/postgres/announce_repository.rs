//! Postgres announcement repository.

use crate::{traits::AnnounceRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_core::{Announce, EchoesResult};
use sqlx::FromRow;
use std::sync::Arc;

/// Postgres announcement repository, backed by a single-row table.
#[derive(Clone)]
pub struct PgAnnounceRepository {
    pool: Arc<DatabasePool>,
}

impl PgAnnounceRepository {
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AnnounceRow {
    content: String,
    date: DateTime<Utc>,
}

#[async_trait]
impl AnnounceRepository for PgAnnounceRepository {
    async fn get(&self) -> EchoesResult<Option<Announce>> {
        let row = sqlx::query_as::<_, AnnounceRow>("SELECT content, date FROM announce LIMIT 1")
            .fetch_optional(self.pool.inner())
            .await?;

        Ok(row.map(|row| Announce {
            content: row.content,
            date: row.date,
        }))
    }

    async fn set(&self, announce: &Announce) -> EchoesResult<Announce> {
        sqlx::query(
            r#"
            INSERT INTO announce (singleton, content, date)
            VALUES (TRUE, $1, $2)
            ON CONFLICT (singleton) DO UPDATE SET content = EXCLUDED.content, date = EXCLUDED.date
            "#,
        )
        .bind(&announce.content)
        .bind(announce.date)
        .execute(self.pool.inner())
        .await?;

        Ok(announce.clone())
    }

    async fn delete(&self) -> EchoesResult<bool> {
        let result = sqlx::query("DELETE FROM announce")
            .execute(self.pool.inner())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
