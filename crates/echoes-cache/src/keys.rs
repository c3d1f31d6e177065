//! Cache key layout.

use crate::version::VersionToken;
use echoes_core::{PageRequest, PostId};
use std::fmt::{self, Display};

/// A family of paginated result sets sharing one version token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaginationScope {
    /// The global post listing.
    Posts,
    /// The comments under one post.
    PostComments(PostId),
}

impl PaginationScope {
    /// Resource kind, used as a metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::PostComments(_) => "comments",
        }
    }
}

impl Display for PaginationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posts => f.write_str("posts"),
            Self::PostComments(post_id) => write!(f, "comments:{post_id}"),
        }
    }
}

/// Key builder for every value the cache layer stores.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    /// Create a new key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Version token key of a pagination scope.
    #[must_use]
    pub fn version(&self, scope: &PaginationScope) -> String {
        match scope {
            PaginationScope::Posts => format!("{}:posts_pagination_version", self.prefix),
            PaginationScope::PostComments(post_id) => {
                format!("{}:comments_pagination_version:{}", self.prefix, post_id)
            }
        }
    }

    /// Page key: scope, version, page number and page size.
    #[must_use]
    pub fn page(&self, scope: &PaginationScope, version: VersionToken, request: PageRequest) -> String {
        format!(
            "{}:{}:{}:page:{}:{}",
            self.prefix, scope, version, request.page, request.size
        )
    }

    /// Snapshot key of a single entity.
    #[must_use]
    pub fn entity(&self, namespace: &str, id: &str) -> String {
        format!("{}:{}:{}", self.prefix, namespace, id)
    }

    /// Sorted-set key of an ordered collection.
    #[must_use]
    pub fn collection(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }

    /// Blob key of one collection member.
    #[must_use]
    pub fn member(&self, collection: &str, id: &str) -> String {
        format!("{}:{}:{}", self.prefix, collection, id)
    }

    /// Hash key of the announcement.
    #[must_use]
    pub fn announce(&self) -> String {
        format!("{}:announce", self.prefix)
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("echoes")
    }
}
