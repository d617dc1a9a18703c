use thiserror::Error;

/// The single failure type returned by every use case.
///
/// The variant carries the HTTP-facing category; the message is safe to show
/// to the caller. Infrastructure details never travel in `Internal`; they are
/// logged where the failure is translated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Internal(String),
}

pub const MSG_INTERNAL: &str = "internal server error";
pub const MSG_NOT_FOUND: &str = "not found";
pub const MSG_UNAUTHORIZED: &str = "unauthorized";
pub const MSG_FORBIDDEN: &str = "forbidden";

impl ServiceError {
    pub fn internal() -> Self {
        Self::Internal(MSG_INTERNAL.to_string())
    }

    pub fn not_found() -> Self {
        Self::NotFound(MSG_NOT_FOUND.to_string())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized(MSG_UNAUTHORIZED.to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(MSG_FORBIDDEN.to_string())
    }

    /// The message carried by any variant.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::TooManyRequests(m)
            | Self::Internal(m) => m,
        }
    }
}
