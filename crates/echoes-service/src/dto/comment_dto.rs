//! Comment-related DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to leave a comment under a post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 64, message = "name is required"))]
    pub name: String,

    #[validate(email(message = "email is invalid"))]
    pub email: String,

    #[validate(length(min = 1, max = 4096, message = "content can't be empty"))]
    pub content: String,
}

impl CreateCommentRequest {
    pub fn new(name: impl Into<String>, email: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            content: self.content.trim().to_string(),
        }
    }
}
