//! Site-wide announcement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single announcement banner shown above the post list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announce {
    pub content: String,
    pub date: DateTime<Utc>,
}

impl Announce {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            date: super::timestamp(),
        }
    }
}
