use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,

    #[error("database operation timed out")]
    Timeout,

    #[error("database error: {0}")]
    Internal(String),
}

/// Postgres SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::PoolTimedOut => StorageError::Timeout,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                StorageError::Timeout
            }
            other => StorageError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Internal(format!("serialization error: {e}"))
    }
}

impl From<StorageError> for atec_core::error::ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::not_found(),
            other => {
                tracing::error!(error = %other, "storage failure");
                Self::internal()
            }
        }
    }
}
