//! # Engine Errors
//!
//! One error type for every public engine operation.
//!
//! ## Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Variant       Raised                       Retried?   Stock touched?  │
//! │  ───────────   ──────────────────────────   ────────   ──────────────  │
//! │  Validation    before the atomic scope      no         no              │
//! │  Core          unknown item, service stock  no         no (rollback)   │
//! │  NotFound      old snapshot missing         no         no (rollback)   │
//! │  Conflict      version moved underneath     no         no (rollback)   │
//! │  Database      busy / locked / I/O          yes        no (rollback)   │
//! │  Database      anything else                no         no (rollback)   │
//! │  Config        engine startup               no         n/a             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger and financial failures never show up here: they are logged and
//! the operation carries on.

use tally_core::{CoreError, ValidationError};
use tally_db::{DbError, TransientError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by [`InventoryEngine`](crate::InventoryEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Payload rejected before any mutation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Business rule violation found inside the scope.
    ///
    /// ## When This Occurs
    /// - A line item id is neither a product nor a service
    /// - A manual adjustment targets a service
    #[error(transparent)]
    Core(CoreError),

    /// The sale or purchase to update/delete does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Optimistic concurrency check failed.
    ///
    /// ## When This Occurs
    /// - The caller's expected version is stale
    /// - Another writer committed between our read and our write
    #[error("{entity} {id} was modified concurrently (expected version {expected_version})")]
    Conflict {
        entity: String,
        id: String,
        expected_version: i64,
    },

    /// Storage failure.
    #[error(transparent)]
    Database(DbError),

    /// Engine configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>, expected_version: i64) -> Self {
        EngineError::Conflict {
            entity: entity.into(),
            id: id.into(),
            expected_version,
        }
    }
}

/// Lifts the repository-level not-found and conflict cases to engine level.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::Conflict {
                entity,
                id,
                expected_version,
            } => EngineError::Conflict {
                entity,
                id,
                expected_version,
            },
            other => EngineError::Database(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => EngineError::Validation(e),
            other => EngineError::Core(other),
        }
    }
}

impl TransientError for EngineError {
    fn is_transient(&self) -> bool {
        matches!(self, EngineError::Database(e) if e.is_transient())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conflict_maps_to_engine_conflict() {
        let err: EngineError = DbError::conflict("Sale", "s-1", 4).into();
        assert!(matches!(err, EngineError::Conflict { expected_version: 4, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_only_transient_db_errors_retry() {
        let busy: EngineError = DbError::Busy("database is locked".into()).into();
        assert!(busy.is_transient());

        let query: EngineError = DbError::QueryFailed("syntax error".into()).into();
        assert!(!query.is_transient());

        let unknown: EngineError = CoreError::UnknownItem("ghost".into()).into();
        assert!(!unknown.is_transient());
    }

    #[test]
    fn test_core_validation_unwraps() {
        let err: EngineError = CoreError::Validation(ValidationError::Required {
            field: "note".into(),
        })
        .into();
        assert!(matches!(err, EngineError::Validation(ValidationError::Required { .. })));
    }
}
