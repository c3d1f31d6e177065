//! Postgres comment repository.

use super::{to_i64, to_u64};
use crate::{traits::CommentRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_core::{Comment, CommentId, EchoesResult, PageRequest, PageResult, PostId};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

/// Postgres comment repository.
#[derive(Clone)]
pub struct PgCommentRepository {
    pool: Arc<DatabasePool>,
}

impl PgCommentRepository {
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: String,
    email: String,
    name: String,
    content: String,
    created: DateTime<Utc>,
    post_id: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: CommentId::from(row.id),
            email: row.email,
            name: row.name,
            content: row.content,
            created: row.created,
            post_id: PostId::from(row.post_id),
        }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn find_by_id(&self, id: &CommentId) -> EchoesResult<Option<Comment>> {
        debug!("Finding comment by id: {}", id);

        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, email, name, content, created, post_id FROM comments WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn create(&self, comment: &Comment) -> EchoesResult<Comment> {
        debug!("Creating comment {} on post {}", comment.id, comment.post_id);

        sqlx::query(
            r#"
            INSERT INTO comments (id, email, name, content, created, post_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id.as_str())
        .bind(&comment.email)
        .bind(&comment.name)
        .bind(&comment.content)
        .bind(comment.created)
        .bind(comment.post_id.as_str())
        .execute(self.pool.inner())
        .await?;

        Ok(comment.clone())
    }

    async fn delete(&self, id: &CommentId) -> EchoesResult<Option<Comment>> {
        debug!("Deleting comment: {}", id);

        let row = sqlx::query_as::<_, CommentRow>(
            "DELETE FROM comments WHERE id = $1 RETURNING id, email, name, content, created, post_id",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn page_as_of(
        &self,
        post_id: &PostId,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> EchoesResult<PageResult<Comment>> {
        debug!(post_id = %post_id, %cutoff, page = page.page, "Loading comments page");

        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, email, name, content, created, post_id
            FROM comments
            WHERE post_id = $1 AND created <= $2
            ORDER BY created DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(post_id.as_str())
        .bind(cutoff)
        .bind(to_i64(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(self.pool.inner())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1 AND created <= $2")
            .bind(post_id.as_str())
            .bind(cutoff)
            .fetch_one(self.pool.inner())
            .await?;

        Ok(PageResult::new(
            rows.into_iter().map(Comment::from).collect(),
            page,
            to_u64(total),
        ))
    }

    async fn count_for_post(&self, post_id: &PostId) -> EchoesResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id.as_str())
            .fetch_one(self.pool.inner())
            .await?;
        Ok(to_u64(total))
    }
}
