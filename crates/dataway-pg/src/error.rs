//! Postgres driver error types. These stay close to `tokio_postgres::Error`
//! (constraint-violation inspection, pool/migration wrapping) because only
//! the Postgres provider needs that granularity; `pg_executor` converts a
//! `PgError` into the dialect-neutral `dataway_core::EngineError` the engine
//! actually surfaces to callers.

use thiserror::Error;

pub type PgResult<T> = Result<T, PgError>;

/// Logs a non-fatal SQL policy warning (e.g. SELECT without LIMIT, a
/// schema-check advisory) without failing the call that triggered it.
pub fn log_sql_warning(message: &str) {
    tracing::warn!(target: "dataway_pg::sql", "{message}");
}

#[derive(Debug, Error)]
pub enum PgError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[cfg(feature = "migrate")]
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("{0}")]
    Other(String),
}

impl PgError {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode { column: column.into(), message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parses a `tokio_postgres::Error` into a more specific `PgError` by
    /// inspecting its SQLSTATE code.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();
            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{constraint}: {message}")),
                "23503" => return Self::ForeignKeyViolation(format!("{constraint}: {message}")),
                "23514" => return Self::CheckViolation(format!("{constraint}: {message}")),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for PgError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(feature = "migrate")]
impl From<refinery::Error> for PgError {
    fn from(err: refinery::Error) -> Self {
        Self::Migration(err.to_string())
    }
}

/// Boundary conversion consulted by `pg_executor` (§7: driver errors
/// convert into the engine taxonomy by inspecting constraint codes, the
/// same way `PgError::from_db_error` does for raw `tokio_postgres::Error`).
impl From<PgError> for dataway_core::EngineError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::NotFound(msg) => dataway_core::EngineError::NotFound(msg),
            PgError::Validation(msg) => dataway_core::EngineError::InvalidRequest(msg),
            PgError::UniqueViolation(_) | PgError::ForeignKeyViolation(_) | PgError::CheckViolation(_) => {
                dataway_core::EngineError::CreateError(err.to_string())
            }
            PgError::Timeout(_) => dataway_core::EngineError::ServiceUnavailable(err.to_string()),
            other => dataway_core::EngineError::QueryError(other.to_string()),
        }
    }
}
