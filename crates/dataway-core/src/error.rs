//! Error taxonomy for dataway (§7).
//!
//! One `thiserror`-derived enum, grounded on the teacher's `OrmError`, but
//! generalized away from a single driver's error type and extended with the
//! fixed kind → HTTP status mapping the spec requires of the error envelope
//! (`{"_error": ..., "_retval": 1}`). Dialect crates convert their native
//! errors into this one via `From` impls that inspect constraint-violation
//! codes the way `OrmError::from_db_error` does for Postgres.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid model type: {0}")]
    InvalidModelType(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("create error: {0}")]
    CreateError(String),

    #[error("update error: {0}")]
    UpdateError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("operation aborted by hook: {0}")]
    HookError(String),

    #[error("invalid preload where: {0}")]
    InvalidPreloadWhere(String),

    #[error("cursor error: {0}")]
    CursorError(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A hook set `Abort=true` with an explicit status/message override.
    #[error("operation aborted by hook: {message}")]
    Aborted { status: u16, message: String },
}

impl EngineError {
    /// Fixed HTTP status per §6/§7's kind → status table.
    pub fn status(&self) -> u16 {
        match self {
            EngineError::InvalidRequest(_) => 400,
            EngineError::InvalidModelType(_) => 400,
            EngineError::NotFound(_) => 404,
            EngineError::QueryError(_) => 500,
            EngineError::CreateError(_) => 500,
            EngineError::UpdateError(_) => 500,
            EngineError::DeleteError(_) => 500,
            EngineError::HookError(_) => 403,
            EngineError::InvalidPreloadWhere(_) => 400,
            EngineError::CursorError(_) => 400,
            EngineError::Internal(_) => 500,
            EngineError::ServiceUnavailable(_) => 503,
            EngineError::Forbidden(_) => 403,
            EngineError::Aborted { status, .. } => *status,
        }
    }

    /// Error taxonomy code, as surfaced in logs and internal metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::InvalidModelType(_) => "invalid_model_type",
            EngineError::NotFound(_) => "not_found",
            EngineError::QueryError(_) => "query_error",
            EngineError::CreateError(_) => "create_error",
            EngineError::UpdateError(_) => "update_error",
            EngineError::DeleteError(_) => "delete_error",
            EngineError::HookError(_) | EngineError::Aborted { .. } => "hook_error",
            EngineError::InvalidPreloadWhere(_) => "invalid_preload_where",
            EngineError::CursorError(_) => "cursor_error",
            EngineError::Internal(_) => "internal_error",
            EngineError::ServiceUnavailable(_) => "service_unavailable",
            EngineError::Forbidden(_) => "forbidden",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn aborted(status: u16, message: impl Into<String>) -> Self {
        Self::Aborted {
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The wire envelope from §6: `{"_error": "...", "_retval": 1}`.
    pub fn envelope(&self) -> serde_json::Value {
        serde_json::json!({ "_error": self.to_string(), "_retval": 1 })
    }
}
