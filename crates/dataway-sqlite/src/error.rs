//! SQLite driver error types, mirroring `dataway-pg`'s `PgError` split.

use thiserror::Error;

pub type LiteResult<T> = Result<T, LiteError>;

#[derive(Debug, Error)]
pub enum LiteError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Database busy")]
    Busy,

    #[error("{0}")]
    Other(String),
}

impl LiteError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn from_sqlite_error(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(sqlite_err, message) = &err {
            match sqlite_err.extended_code {
                2067 | 1555 => return Self::UniqueViolation(message.clone().unwrap_or_default()),
                787 => return Self::ForeignKeyViolation(message.clone().unwrap_or_default()),
                5 | 6 => return Self::Busy,
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<LiteError> for dataway_core::EngineError {
    fn from(err: LiteError) -> Self {
        match err {
            LiteError::NotFound(msg) => dataway_core::EngineError::NotFound(msg),
            LiteError::UniqueViolation(_) | LiteError::ForeignKeyViolation(_) => {
                dataway_core::EngineError::CreateError(err.to_string())
            }
            LiteError::Busy => dataway_core::EngineError::ServiceUnavailable(err.to_string()),
            other => dataway_core::EngineError::QueryError(other.to_string()),
        }
    }
}
