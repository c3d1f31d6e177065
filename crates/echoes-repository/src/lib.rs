//! # Echoes Repository
//!
//! Source-of-truth data access:
//!
//! ```text
//! Service
//!   ↓  Arc<dyn PostRepository>   (domain interface)
//! PgPostRepository | MemoryDatabase
//!   ↓
//! Postgres
//! ```

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod traits;

pub use memory::MemoryDatabase;
pub use pool::*;
pub use postgres::*;
pub use traits::*;
