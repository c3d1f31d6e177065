//! Announcement service trait definition.

use crate::dto::CreateAnnounceRequest;
use async_trait::async_trait;
use echoes_core::{Announce, EchoesResult};

/// Announcement service trait.
#[async_trait]
pub trait AnnounceService: Send + Sync {
    /// Gets the current announcement, if any.
    async fn get_announce(&self) -> EchoesResult<Option<Announce>>;

    /// Publishes a new announcement, replacing the previous one.
    async fn create_announce(&self, request: CreateAnnounceRequest) -> EchoesResult<Announce>;

    /// Removes the announcement. Returns whether one existed.
    async fn delete_announce(&self) -> EchoesResult<bool>;
}
