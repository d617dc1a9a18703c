use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("lock {key} is held by another owner")]
    LockNotAcquired { key: String },

    #[error("waited too long for lock on {key}")]
    LockWaitTooLong { key: String },

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

impl From<CacheError> for atec_core::error::ServiceError {
    fn from(e: CacheError) -> Self {
        tracing::error!(error = %e, "cache failure");
        Self::internal()
    }
}
