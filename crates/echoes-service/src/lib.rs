//! # Echoes Service
//!
//! Cache-aside services, one per resource. Reads try the cache first and fall
//! back to the repository; writes go to the repository and leave the cache
//! work to a detached, time-bounded task. The repository is always the
//! authority: no cache failure ever reaches a caller.

pub mod announce_service;
pub mod background;
pub mod cache_layer;
pub mod comment_service;
pub mod dto;
pub mod r#impl;
pub mod link_service;
pub mod metrics;
pub mod post_service;

pub use announce_service::*;
pub use background::BackgroundTasks;
pub use cache_layer::*;
pub use comment_service::*;
pub use dto::*;
pub use link_service::*;
pub use post_service::*;
pub use r#impl::*;

/// Registers metric descriptions of the whole cache layer.
pub fn register_metrics() {
    echoes_cache::register_metrics();
    crate::metrics::register_metrics();
}
