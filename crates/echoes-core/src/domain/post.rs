//! Post entity.

use crate::{Entity, PostId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    /// Markdown source.
    pub content: String,
    pub created: DateTime<Utc>,
    /// Pinned posts sort before all others.
    pub pinned: bool,
    /// Short-form post without a title page.
    pub tweet: bool,
    /// Number of comments, denormalized for listings.
    pub comments: u64,
}

impl Post {
    /// Creates a new unpinned post with a generated id.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>, tweet: bool) -> Self {
        Self {
            id: PostId::generate(),
            title: title.into(),
            content: content.into(),
            created: super::timestamp(),
            pinned: false,
            tweet,
            comments: 0,
        }
    }
}

impl Entity for Post {
    type Id = PostId;

    fn id(&self) -> &PostId {
        &self.id
    }
}
