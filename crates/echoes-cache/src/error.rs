//! Cache error types.

use echoes_core::EchoesError;
use thiserror::Error;

/// Result type for key-value store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures of the key-value store.
///
/// None of these ever reach a service caller: the cache components log them
/// with [`CacheError::class`] and degrade to a miss or a skipped write.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation against a key holding the wrong kind of value.
    #[error("Wrong type for key '{0}'")]
    WrongType(String),

    /// Stored value is not in the expected format.
    #[error("Corrupt value for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// The cache is switched off.
    #[error("Cache is disabled")]
    Disabled,

    /// Any other backend failure.
    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Short, stable name of the error class for logs and metric labels.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Pool(_) => "pool",
            Self::Serialization(_) => "serialization",
            Self::WrongType(_) => "wrong_type",
            Self::Corrupt { .. } => "corrupt",
            Self::Disabled => "disabled",
            Self::Backend(_) => "backend",
        }
    }
}

impl From<CacheError> for EchoesError {
    fn from(err: CacheError) -> Self {
        Self::Cache(err.to_string())
    }
}
