//! Announcement DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to publish the announcement, replacing any previous one.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAnnounceRequest {
    #[validate(length(min = 1, max = 1024, message = "content can't be empty"))]
    pub content: String,
}

impl CreateAnnounceRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            content: self.content.trim().to_string(),
        }
    }
}
