//! Postgres repository implementations.

mod announce_repository;
mod comment_repository;
mod link_repository;
mod post_repository;

pub use announce_repository::PgAnnounceRepository;
pub use comment_repository::PgCommentRepository;
pub use link_repository::PgLinkRepository;
pub use post_repository::PgPostRepository;

/// Converts a page coordinate to a bind parameter.
fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Converts a `COUNT(*)` result back to a total.
fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
