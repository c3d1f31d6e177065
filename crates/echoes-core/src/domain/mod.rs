//! Domain models for the blog: posts, comments, links and the announcement.

mod announce;
mod comment;
mod link;
mod post;

pub use announce::Announce;
pub use comment::Comment;
pub use link::Link;
pub use post::Post;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision the database stores.
#[must_use]
pub fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
