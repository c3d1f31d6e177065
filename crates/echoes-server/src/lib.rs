//! # Echoes Server Library
//!
//! Wiring of the cache-aside services over Postgres and Redis (or in-memory
//! storage), cache warm-up, and startup utilities.

pub mod app;
pub mod startup;
pub mod warm;

pub use app::{AppBuilder, Application, StorageMode};
pub use warm::CacheWarmer;
