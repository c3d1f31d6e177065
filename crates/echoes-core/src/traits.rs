//! Core traits shared across layers.

use std::fmt::Display;

/// Trait for entities with a unique identifier.
///
/// The cache layer keys snapshots by `id().to_string()`.
pub trait Entity {
    /// The identifier type.
    type Id: Display + Clone + Send + Sync;

    /// Returns the entity's unique identifier.
    fn id(&self) -> &Self::Id;
}
