//! Comment entity.

use crate::{CommentId, Entity, PostId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reader comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub email: String,
    pub name: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub post_id: PostId,
}

impl Comment {
    /// Creates a new comment with a generated id.
    #[must_use]
    pub fn new(
        post_id: PostId,
        name: impl Into<String>,
        email: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: CommentId::generate(),
            email: email.into(),
            name: name.into(),
            content: content.into(),
            created: super::timestamp(),
            post_id,
        }
    }
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> &CommentId {
        &self.id
    }
}
