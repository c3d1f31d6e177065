//! Postgres post repository.

use super::{to_i64, to_u64};
use crate::{traits::PostRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_core::{EchoesError, EchoesResult, PageRequest, PageResult, Post, PostId};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

const SELECT_POST: &str = r#"
    SELECT p.id, p.title, p.content, p.created, p.pinned, p.tweet,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments
    FROM posts p
"#;

/// Postgres post repository.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: Arc<DatabasePool>,
}

impl PgPostRepository {
    #[must_use]
    pub fn new(pool: Arc<DatabasePool>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a post.
#[derive(Debug, FromRow)]
struct PostRow {
    id: String,
    title: String,
    content: String,
    created: DateTime<Utc>,
    pinned: bool,
    tweet: bool,
    comments: i64,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId::from(row.id),
            title: row.title,
            content: row.content,
            created: row.created,
            pinned: row.pinned,
            tweet: row.tweet,
            comments: to_u64(row.comments),
        }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_id(&self, id: &PostId) -> EchoesResult<Option<Post>> {
        debug!("Finding post by id: {}", id);

        let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = $1"))
            .bind(id.as_str())
            .fetch_optional(self.pool.inner())
            .await?;

        Ok(row.map(Post::from))
    }

    async fn create(&self, post: &Post) -> EchoesResult<Post> {
        debug!("Creating post: {}", post.id);

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, created, pinned, tweet)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.id.as_str())
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.created)
        .bind(post.pinned)
        .bind(post.tweet)
        .execute(self.pool.inner())
        .await?;

        let mut created = post.clone();
        created.comments = 0;
        Ok(created)
    }

    async fn update(&self, post: &Post) -> EchoesResult<Post> {
        debug!("Updating post: {}", post.id);

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, content = $3, pinned = $4, tweet = $5
            WHERE id = $1
            "#,
        )
        .bind(post.id.as_str())
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.pinned)
        .bind(post.tweet)
        .execute(self.pool.inner())
        .await?;

        if result.rows_affected() == 0 {
            return Err(EchoesError::not_found("Post", &post.id));
        }

        self.find_by_id(&post.id)
            .await?
            .ok_or_else(|| EchoesError::not_found("Post", &post.id))
    }

    async fn delete(&self, id: &PostId) -> EchoesResult<Option<Post>> {
        debug!("Deleting post: {}", id);

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = $1 FOR UPDATE"))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Post::from(row)))
    }

    async fn page_as_of(&self, cutoff: DateTime<Utc>, page: PageRequest) -> EchoesResult<PageResult<Post>> {
        debug!(%cutoff, page = page.page, size = page.size, "Loading posts page");

        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{SELECT_POST} WHERE p.created <= $1 ORDER BY p.pinned DESC, p.created DESC, p.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(cutoff)
        .bind(to_i64(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(self.pool.inner())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE created <= $1")
            .bind(cutoff)
            .fetch_one(self.pool.inner())
            .await?;

        Ok(PageResult::new(
            rows.into_iter().map(Post::from).collect(),
            page,
            to_u64(total),
        ))
    }
}
