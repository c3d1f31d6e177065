//! Request DTOs.
//!
//! Every request is trimmed before it is validated, so whitespace-only input
//! counts as empty.

mod announce_dto;
mod comment_dto;
mod link_dto;
mod post_dto;

pub use announce_dto::*;
pub use comment_dto::*;
pub use link_dto::*;
pub use post_dto::*;
