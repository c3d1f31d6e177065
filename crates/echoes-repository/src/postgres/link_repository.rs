//! Postgres link repository.

use crate::{traits::LinkRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_core::{EchoesResult, Link, LinkId};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

/// Postgres link repository.
#[derive(Clone)]
pub struct PgLinkRepository {
    pool: Arc<DatabasePool>,
}

impl PgLinkRepository {
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LinkRow {
    id: String,
    name: String,
    url: String,
    created: DateTime<Utc>,
    icon: String,
    place: i32,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link {
            id: LinkId::from(row.id),
            name: row.name,
            url: row.url,
            created: row.created,
            icon: row.icon,
            place: row.place,
        }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_all(&self) -> EchoesResult<Vec<Link>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT id, name, url, created, icon, place FROM links ORDER BY place ASC, created ASC",
        )
        .fetch_all(self.pool.inner())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn find_by_id(&self, id: &LinkId) -> EchoesResult<Option<Link>> {
        debug!("Finding link by id: {}", id);

        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT id, name, url, created, icon, place FROM links WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn create(&self, link: &Link) -> EchoesResult<Link> {
        debug!("Creating link: {}", link.id);

        sqlx::query(
            r#"
            INSERT INTO links (id, name, url, created, icon, place)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(link.id.as_str())
        .bind(&link.name)
        .bind(&link.url)
        .bind(link.created)
        .bind(&link.icon)
        .bind(link.place)
        .execute(self.pool.inner())
        .await?;

        Ok(link.clone())
    }

    async fn delete(&self, id: &LinkId) -> EchoesResult<Option<Link>> {
        debug!("Deleting link: {}", id);

        let row = sqlx::query_as::<_, LinkRow>(
            "DELETE FROM links WHERE id = $1 RETURNING id, name, url, created, icon, place",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(Link::from))
    }
}
