//! Link service trait definition.

use crate::dto::CreateLinkRequest;
use async_trait::async_trait;
use echoes_core::{EchoesResult, Link, LinkId};

/// Link service trait.
#[async_trait]
pub trait LinkService: Send + Sync {
    /// Lists every link in display order.
    async fn get_links(&self) -> EchoesResult<Vec<Link>>;

    /// Gets a link by ID.
    async fn get_link(&self, id: &LinkId) -> EchoesResult<Link>;

    async fn create_link(&self, request: CreateLinkRequest) -> EchoesResult<Link>;

    async fn delete_link(&self, id: &LinkId) -> EchoesResult<Link>;
}
