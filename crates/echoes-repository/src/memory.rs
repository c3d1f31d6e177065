//! In-memory repositories.
//!
//! One [`MemoryDatabase`] implements every repository trait over shared
//! tables, so comment counts and cascading deletes behave like the database.
//! Used by tests and by local runs without Postgres.

use crate::traits::{AnnounceRepository, CommentRepository, LinkRepository, PostRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echoes_core::{
    Announce, Comment, CommentId, EchoesError, EchoesResult, Link, LinkId, PageRequest, PageResult, Post, PostId,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
    links: HashMap<LinkId, Link>,
    announce: Option<Announce>,
}

impl Tables {
    fn comment_count(&self, post_id: &PostId) -> u64 {
        self.comments.values().filter(|c| &c.post_id == post_id).count() as u64
    }

    fn with_count(&self, post: &Post) -> Post {
        let mut post = post.clone();
        post.comments = self.comment_count(&post.id);
        post
    }
}

/// In-memory source of truth.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn slice_page<T>(items: Vec<T>, request: PageRequest) -> PageResult<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    let items = items.into_iter().skip(offset).take(limit).collect();
    PageResult::new(items, request, total)
}

#[async_trait]
impl PostRepository for MemoryDatabase {
    async fn find_by_id(&self, id: &PostId) -> EchoesResult<Option<Post>> {
        let tables = self.tables.read();
        Ok(tables.posts.get(id).map(|post| tables.with_count(post)))
    }

    async fn create(&self, post: &Post) -> EchoesResult<Post> {
        let mut tables = self.tables.write();
        if tables.posts.contains_key(&post.id) {
            return Err(EchoesError::Conflict(format!("Post {} already exists", post.id)));
        }
        tables.posts.insert(post.id.clone(), post.clone());
        Ok(tables.with_count(post))
    }

    async fn update(&self, post: &Post) -> EchoesResult<Post> {
        let mut tables = self.tables.write();
        match tables.posts.get_mut(&post.id) {
            Some(existing) => {
                existing.title.clone_from(&post.title);
                existing.content.clone_from(&post.content);
                existing.pinned = post.pinned;
                existing.tweet = post.tweet;
            }
            None => return Err(EchoesError::not_found("Post", &post.id)),
        }
        let updated = tables.posts[&post.id].clone();
        Ok(tables.with_count(&updated))
    }

    async fn delete(&self, id: &PostId) -> EchoesResult<Option<Post>> {
        let mut tables = self.tables.write();
        let Some(post) = tables.posts.remove(id) else {
            return Ok(None);
        };
        let post = tables.with_count(&post);
        tables.comments.retain(|_, c| &c.post_id != id);
        Ok(Some(post))
    }

    async fn page_as_of(&self, cutoff: DateTime<Utc>, page: PageRequest) -> EchoesResult<PageResult<Post>> {
        let tables = self.tables.read();
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.created <= cutoff)
            .map(|p| tables.with_count(p))
            .collect();
        posts.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.created.cmp(&a.created))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(slice_page(posts, page))
    }
}

#[async_trait]
impl CommentRepository for MemoryDatabase {
    async fn find_by_id(&self, id: &CommentId) -> EchoesResult<Option<Comment>> {
        Ok(self.tables.read().comments.get(id).cloned())
    }

    async fn create(&self, comment: &Comment) -> EchoesResult<Comment> {
        let mut tables = self.tables.write();
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(EchoesError::not_found("Post", &comment.post_id));
        }
        tables.comments.insert(comment.id.clone(), comment.clone());
        Ok(comment.clone())
    }

    async fn delete(&self, id: &CommentId) -> EchoesResult<Option<Comment>> {
        Ok(self.tables.write().comments.remove(id))
    }

    async fn page_as_of(
        &self,
        post_id: &PostId,
        cutoff: DateTime<Utc>,
        page: PageRequest,
    ) -> EchoesResult<PageResult<Comment>> {
        let mut comments: Vec<Comment> = self
            .tables
            .read()
            .comments
            .values()
            .filter(|c| &c.post_id == post_id && c.created <= cutoff)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
        Ok(slice_page(comments, page))
    }

    async fn count_for_post(&self, post_id: &PostId) -> EchoesResult<u64> {
        Ok(self.tables.read().comment_count(post_id))
    }
}

#[async_trait]
impl LinkRepository for MemoryDatabase {
    async fn find_all(&self) -> EchoesResult<Vec<Link>> {
        let mut links: Vec<Link> = self.tables.read().links.values().cloned().collect();
        links.sort_by(|a, b| a.place.cmp(&b.place).then_with(|| a.created.cmp(&b.created)));
        Ok(links)
    }

    async fn find_by_id(&self, id: &LinkId) -> EchoesResult<Option<Link>> {
        Ok(self.tables.read().links.get(id).cloned())
    }

    async fn create(&self, link: &Link) -> EchoesResult<Link> {
        let mut tables = self.tables.write();
        if tables.links.contains_key(&link.id) {
            return Err(EchoesError::Conflict(format!("Link {} already exists", link.id)));
        }
        tables.links.insert(link.id.clone(), link.clone());
        Ok(link.clone())
    }

    async fn delete(&self, id: &LinkId) -> EchoesResult<Option<Link>> {
        Ok(self.tables.write().links.remove(id))
    }
}

#[async_trait]
impl AnnounceRepository for MemoryDatabase {
    async fn get(&self) -> EchoesResult<Option<Announce>> {
        Ok(self.tables.read().announce.clone())
    }

    async fn set(&self, announce: &Announce) -> EchoesResult<Announce> {
        self.tables.write().announce = Some(announce.clone());
        Ok(announce.clone())
    }

    async fn delete(&self) -> EchoesResult<bool> {
        Ok(self.tables.write().announce.take().is_some())
    }
}
