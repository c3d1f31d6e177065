//! Service implementations.
//!
//! Trait definitions live in the parent module (e.g. `post_service.rs`).

pub mod announce_service_impl;
pub mod comment_service_impl;
pub mod link_service_impl;
pub mod post_service_impl;

pub use announce_service_impl::AnnounceServiceImpl;
pub use comment_service_impl::CommentServiceImpl;
pub use link_service_impl::LinkServiceImpl;
pub use post_service_impl::PostServiceImpl;
