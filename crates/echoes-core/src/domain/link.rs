//! Link entity.

use crate::{Entity, LinkId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sidebar link, displayed in ascending `place` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub url: String,
    pub created: DateTime<Utc>,
    pub icon: String,
    pub place: i32,
}

impl Link {
    /// Creates a new link with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, icon: impl Into<String>, place: i32) -> Self {
        Self {
            id: LinkId::generate(),
            name: name.into(),
            url: url.into(),
            created: super::timestamp(),
            icon: icon.into(),
            place,
        }
    }
}

impl Entity for Link {
    type Id = LinkId;

    fn id(&self) -> &LinkId {
        &self.id
    }
}
