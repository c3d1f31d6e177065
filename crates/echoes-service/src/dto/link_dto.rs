//! Link-related DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_place() -> i32 {
    1
}

/// Request to add a sidebar link.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLinkRequest {
    #[validate(length(min = 1, max = 128, message = "name can't be empty"))]
    pub name: String,

    #[validate(url(message = "url must be valid"))]
    pub url: String,

    #[serde(default)]
    pub icon: String,

    /// Display position, ascending.
    #[serde(default = "default_place")]
    pub place: i32,
}

impl CreateLinkRequest {
    pub fn new(name: impl Into<String>, url: impl Into<String>, icon: impl Into<String>, place: i32) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            icon: icon.into(),
            place,
        }
    }

    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            url: self.url.trim().to_string(),
            icon: self.icon.trim().to_string(),
            place: self.place,
        }
    }
}
