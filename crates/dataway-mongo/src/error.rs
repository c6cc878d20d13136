//! Document store driver error types, mirroring `dataway-pg`'s `PgError`
//! split.

use thiserror::Error;

pub type DocResult<T> = Result<T, DocError>;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] mongodb::error::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not a SQL dialect provider")]
    NotSql,

    #[error("{0}")]
    Other(String),
}

impl DocError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn from_mongo_error(err: mongodb::error::Error) -> Self {
        if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) = err.kind.as_ref() {
            if we.code == 11000 {
                return Self::DuplicateKey(we.message.clone());
            }
        }
        Self::Query(err)
    }
}

impl From<DocError> for dataway_core::EngineError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::NotFound(msg) => dataway_core::EngineError::NotFound(msg),
            DocError::DuplicateKey(_) => dataway_core::EngineError::CreateError(err.to_string()),
            DocError::NotSql => dataway_core::EngineError::InvalidModelType(err.to_string()),
            other => dataway_core::EngineError::QueryError(other.to_string()),
        }
    }
}
