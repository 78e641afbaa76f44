//! # Boundary Responses
//!
//! Serializable results for callers that must never see a Rust error.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  engine.update_sale(..)                                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  EngineResult<T> ──► ActionResult::from(..)                            │
//! │                            │                                            │
//! │         ┌──────────────────┴───────────────────┐                        │
//! │         ▼                                      ▼                        │
//! │  { "status": "success",              { "status": "failure",             │
//! │    "data": { ... } }                   "error": { "code": "CONFLICT",   │
//! │                                                   "message": "..." } }  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged here and reach the caller only as a generic
//! message with a `DATABASE_ERROR` / `INTERNAL` code.

use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;

use crate::error::{EngineError, EngineResult};

/// Error half of an [`ActionResult`].
///
/// ```json
/// {
///   "code": "UNKNOWN_ITEM",
///   "message": "Unknown catalog item: 7f3c..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for boundary responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Sale, purchase or product missing
    NotFound,

    /// Payload rejected before any mutation
    ValidationError,

    /// Line item id is neither a product nor a service
    UnknownItem,

    /// Stock adjustment aimed at a service
    NotStockTracked,

    /// Stale version; reload and retry
    Conflict,

    /// Database busy after retries; safe to try again
    Busy,

    /// Storage failure
    DatabaseError,

    /// Engine misconfigured
    ConfigError,

    /// Anything else
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::validation(format!("{} '{}' already exists", field, value))
            }
            conflict @ DbError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, conflict.to_string()),
            DbError::Busy(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::Busy, "Database is busy, please try again")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            other => {
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match err {
            CoreError::UnknownItem(_) => ErrorCode::UnknownItem,
            CoreError::NotStockTracked(_) => ErrorCode::NotStockTracked,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(e) => ApiError::validation(e.to_string()),
            EngineError::Core(e) => e.into(),
            EngineError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            conflict @ EngineError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, conflict.to_string()),
            EngineError::Database(e) => e.into(),
            EngineError::Config(e) => {
                tracing::error!("Engine configuration error: {}", e);
                ApiError::new(ErrorCode::ConfigError, e.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// ActionResult
// =============================================================================

/// Discriminated success / failure value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ActionResult<T> {
    Success { data: T },
    Failure { error: ApiError },
}

impl<T> ActionResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success { .. })
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ActionResult::Success { .. } => None,
            ActionResult::Failure { error } => Some(error),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ActionResult::Success { data } => Some(data),
            ActionResult::Failure { .. } => None,
        }
    }
}

impl<T> From<EngineResult<T>> for ActionResult<T> {
    fn from(result: EngineResult<T>) -> Self {
        match result {
            Ok(data) => ActionResult::Success { data },
            Err(e) => ActionResult::Failure { error: e.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ValidationError;

    #[test]
    fn test_success_serialization() {
        let ok: EngineResult<u32> = Ok(7);
        let result = ActionResult::from(ok);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "success", "data": 7 }));
    }

    #[test]
    fn test_failure_carries_code_and_message() {
        let rejected: EngineResult<()> = Err(EngineError::from(ValidationError::ReceivedExceedsTotal {
            field: "received_cents".into(),
            amount: 2000,
            total: 1500,
        }));
        let result = ActionResult::from(rejected);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "received_cents (2000) exceeds total (1500)");
    }

    #[test]
    fn test_error_codes() {
        let conflict: ApiError = EngineError::conflict("Sale", "s-1", 2).into();
        assert_eq!(conflict.code, ErrorCode::Conflict);

        let unknown: ApiError = EngineError::from(CoreError::UnknownItem("ghost".into())).into();
        assert_eq!(unknown.code, ErrorCode::UnknownItem);

        let busy: ApiError = EngineError::from(DbError::Busy("database is locked".into())).into();
        assert_eq!(busy.code, ErrorCode::Busy);

        let internal: ApiError = EngineError::from(DbError::QueryFailed("near SELEC".into())).into();
        assert_eq!(internal.code, ErrorCode::DatabaseError);
        assert!(!internal.message.contains("SELEC"));
    }
}
