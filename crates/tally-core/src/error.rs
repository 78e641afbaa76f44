//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Payload validation failures                    │
//! │                                                                         │
//! │  tally-db errors                                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine errors                                                   │
//! │  ├── EngineError      - Everything an operation can fail with          │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line item references an id that is neither a product nor a service.
    ///
    /// ## When This Occurs
    /// - Typo or stale id sent by the caller
    /// - Catalog entry removed after the form was loaded
    ///
    /// The whole operation is rejected before any stock is touched.
    #[error("Unknown catalog item: {0}")]
    UnknownItem(String),

    /// A stock adjustment targeted something that does not hold stock.
    #[error("Item {0} is a service and has no stock")]
    NotStockTracked(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation happens, surfaced verbatim to the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., the same line id twice in one payload).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// Received or paid amount is larger than the transaction total.
    ///
    /// ## User Workflow
    /// ```text
    /// Total: 1500   Received: 2000
    ///      │
    ///      ▼
    /// ReceivedExceedsTotal { field: "received_cents", .. }
    ///      │
    ///      ▼
    /// UI shows: "received_cents (2000) exceeds total (1500)"
    /// ```
    #[error("{field} ({amount}) exceeds total ({total})")]
    ReceivedExceedsTotal {
        field: String,
        amount: i64,
        total: i64,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
