use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    /// A uniqueness constraint rejected an insert.
    #[error("already exists")]
    AlreadyExists,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Integrity(String),

    #[error("{0}")]
    UpstreamFetch(String),

    #[error("identifier allocation exhausted after {0} attempts")]
    AllocationExhausted(u32),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("token expired")]
    TokenExpired,
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// True for failures whose detail must not be shown to API callers.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Database(_)
                | Error::Io(_)
                | Error::Internal(_)
                | Error::Config(_)
                | Error::AllocationExhausted(_)
                | Error::AlreadyExists
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
