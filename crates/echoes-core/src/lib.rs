//! # Echoes Core
//!
//! Core types, domain models, and error definitions for the Echoes blog
//! backend. Every other crate in the workspace builds on these.

pub mod domain;
pub mod error;
pub mod id;
pub mod pagination;
pub mod result;
pub mod telemetry;
pub mod traits;
pub mod validation;

pub use domain::*;
pub use error::*;
pub use id::*;
pub use pagination::*;
pub use result::*;
pub use traits::*;
pub use validation::*;
