//! MySQL driver error types, mirroring `dataway-pg`'s `PgError` split:
//! driver-specific here, converted into the dialect-neutral `EngineError`
//! at the provider boundary.

use thiserror::Error;

pub type MyResult<T> = Result<T, MyError>;

#[derive(Debug, Error)]
pub enum MyError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] mysql_async::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Foreign key constraint fails: {0}")]
    ForeignKeyViolation(String),

    #[error("Query timeout")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl MyError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Inspects the MySQL server error code the way `PgError::from_db_error`
    /// inspects a Postgres SQLSTATE.
    pub fn from_server_error(err: mysql_async::Error) -> Self {
        if let mysql_async::Error::Server(server_err) = &err {
            match server_err.code {
                1062 => return Self::DuplicateEntry(server_err.message.clone()),
                1451 | 1452 => return Self::ForeignKeyViolation(server_err.message.clone()),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<MyError> for dataway_core::EngineError {
    fn from(err: MyError) -> Self {
        match err {
            MyError::NotFound(msg) => dataway_core::EngineError::NotFound(msg),
            MyError::DuplicateEntry(_) | MyError::ForeignKeyViolation(_) => {
                dataway_core::EngineError::CreateError(err.to_string())
            }
            MyError::Timeout => dataway_core::EngineError::ServiceUnavailable(err.to_string()),
            other => dataway_core::EngineError::QueryError(other.to_string()),
        }
    }
}
