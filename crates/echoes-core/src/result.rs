//! Result type aliases for Echoes.

use crate::EchoesError;

/// A specialized `Result` type for Echoes operations.
pub type EchoesResult<T> = Result<T, EchoesError>;
