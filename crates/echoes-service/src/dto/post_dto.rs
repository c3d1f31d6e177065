//! Post-related DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a new post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 256, message = "title can't be empty"))]
    pub title: String,

    #[validate(length(min = 1, message = "content can't be empty"))]
    pub content: String,

    #[serde(default)]
    pub tweet: bool,
}

impl CreatePostRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tweet: bool) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tweet,
        }
    }

    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            tweet: self.tweet,
        }
    }
}

/// Request to update a post. Pinning is a separate operation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 256, message = "title can't be empty"))]
    pub title: String,

    #[validate(length(min = 1, message = "content can't be empty"))]
    pub content: String,

    #[serde(default)]
    pub tweet: bool,
}

impl UpdatePostRequest {
    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            tweet: self.tweet,
        }
    }
}
