//! # Validation Module
//!
//! Payload validation. Runs before anything touches the database.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure, before the atomic scope)                  │
//! │  ├── quantities > 0, amounts ≥ 0                                       │
//! │  ├── received / paid ≤ total                                           │
//! │  └── line ids unique within a payload                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (inside the atomic scope, before any write)           │
//! │  └── every item id exists in the catalog                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity > 0)                                              │
//! │  └── append-only triggers on stock_ledger                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::types::{LineItemInput, SalePayload};
//! use tally_core::validation::validate_sale_payload;
//!
//! let payload = SalePayload::new("completed", "cash", vec![LineItemInput::new("coke", 2, 150)]);
//! assert!(validate_sale_payload(&payload).is_ok());
//!
//! let overpaid = payload.clone().with_received(10_000);
//! assert!(validate_sale_payload(&overpaid).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{LineItemInput, PurchasePayload, SalePayload};
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_UNIT_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_TEXT_LEN: usize = 200;
const MAX_NOTE_LEN: usize = 1000;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a non-empty, bounded text field.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_max_len(field, value, MAX_TEXT_LEN)
}

fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(value) => validate_max_len(field, value, max),
        None => Ok(()),
    }
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a monetary amount in cents (zero allowed).
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a per-unit price or cost: zero up to MAX_UNIT_CENTS.
pub fn validate_unit_cents(field: &str, cents: i64) -> ValidationResult<()> {
    validate_amount_cents(field, cents)?;

    if cents > MAX_UNIT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_CENTS,
        });
    }
    Ok(())
}

/// Received (or paid) must not exceed the total.
pub fn validate_received(field: &str, amount: i64, total: i64) -> ValidationResult<()> {
    validate_amount_cents(field, amount)?;

    if amount > total {
        return Err(ValidationError::ReceivedExceedsTotal {
            field: field.to_string(),
            amount,
            total,
        });
    }
    Ok(())
}

/// Validates the item list of a payload.
///
/// ## Rules
/// - At least one line, at most MAX_LINE_ITEMS
/// - Every line names an item and has a valid quantity
/// - Prices and cost snapshots are within 0..=MAX_UNIT_CENTS
/// - A line id appears at most once
pub fn validate_line_items(items: &[LineItemInput]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    let mut seen_ids = HashSet::new();
    for item in items {
        validate_required("item_id", &item.item_id)?;
        validate_quantity(item.quantity)?;
        validate_unit_cents("unit_price_cents", item.unit_price_cents)?;
        if let Some(cost) = item.unit_cost_cents {
            validate_unit_cents("unit_cost_cents", cost)?;
        }

        if let Some(id) = item.id.as_deref() {
            if !seen_ids.insert(id) {
                return Err(ValidationError::Duplicate {
                    field: "line id".to_string(),
                    value: id.to_string(),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates a sale payload.
pub fn validate_sale_payload(payload: &SalePayload) -> ValidationResult<()> {
    validate_required("status", &payload.status)?;
    validate_required("payment_method", &payload.payment_method)?;
    validate_optional("invoice_number", payload.invoice_number.as_deref(), MAX_TEXT_LEN)?;
    validate_optional("customer_name", payload.customer_name.as_deref(), MAX_TEXT_LEN)?;
    validate_optional("notes", payload.notes.as_deref(), MAX_NOTE_LEN)?;
    validate_line_items(&payload.items)?;
    validate_amount_cents("total_cents", payload.total_cents)?;
    validate_received("received_cents", payload.received_cents, payload.total_cents)
}

/// Validates a purchase payload.
pub fn validate_purchase_payload(payload: &PurchasePayload) -> ValidationResult<()> {
    validate_required("delivery_status", &payload.delivery_status)?;
    validate_required("payment_status", &payload.payment_status)?;
    validate_required("payment_method", &payload.payment_method)?;
    validate_optional("reference_number", payload.reference_number.as_deref(), MAX_TEXT_LEN)?;
    validate_optional("supplier_name", payload.supplier_name.as_deref(), MAX_TEXT_LEN)?;
    validate_optional("notes", payload.notes.as_deref(), MAX_NOTE_LEN)?;
    validate_line_items(&payload.items)?;
    validate_amount_cents("total_cents", payload.total_cents)?;
    validate_received("paid_cents", payload.paid_cents, payload.total_cents)
}

/// Validates a manual stock adjustment.
pub fn validate_adjustment(delta: i64, note: &str) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::Required {
            field: "delta".to_string(),
        });
    }

    if delta.abs() > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_ITEM_QUANTITY,
            max: MAX_ITEM_QUANTITY,
        });
    }

    validate_required("note", note)?;
    validate_max_len("note", note, MAX_NOTE_LEN)
}

// =============================================================================
// Unit Tests
// =============================================================================
