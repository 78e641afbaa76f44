//! # Stock Mutator
//!
//! Applies one planned [`StockMovement`] to the products table.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  direction / mode        update                         notes           │
//! │  ─────────────────────   ────────────────────────────   ─────────────── │
//! │  out  (any mode)         stock - qty                    may go negative │
//! │  in   forward            stock + qty                    purchase receipt│
//! │  in   reversal           MAX(0, stock + qty)            restore clamp   │
//! │  none / qty 0            no update, lookup only                         │
//! │  id not a product        no update                      service: inert  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exactly one `UPDATE products` per stock-moving call.

use sqlx::SqliteConnection;
use tally_core::{MovementMode, StockDirection, StockMovement};
use tally_db::{DbResult, ProductRepository, StockChange};
use tracing::{debug, warn};

/// What happened to stock for one movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    /// The id is not a stock-tracked product.
    Service,
    /// Stock was updated.
    Applied(StockChange),
    /// Nothing to move; current stock for the ledger row.
    Unchanged { stock: i64 },
}

impl StockOutcome {
    /// Stock after the movement, if the item holds stock at all.
    pub fn stock_after(&self) -> Option<i64> {
        match self {
            StockOutcome::Service => None,
            StockOutcome::Applied(change) => Some(change.after),
            StockOutcome::Unchanged { stock } => Some(*stock),
        }
    }

    /// Signed change actually written.
    pub fn applied_delta(&self) -> i64 {
        match self {
            StockOutcome::Applied(change) => change.applied_delta(),
            _ => 0,
        }
    }
}

/// Applies `movement` on the scope's connection.
pub async fn apply_movement(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<StockOutcome> {
    if movement.is_noop() {
        return Ok(match ProductRepository::stock_of(conn, &movement.item_id).await? {
            Some(stock) => StockOutcome::Unchanged { stock },
            None => StockOutcome::Service,
        });
    }

    let floor_zero = movement.direction == StockDirection::In && movement.mode == MovementMode::Reversal;

    let change =
        ProductRepository::apply_stock_delta(conn, &movement.item_id, movement.signed_delta(), floor_zero).await?;

    let Some(change) = change else {
        debug!(item_id = %movement.item_id, reason = %movement.reason, "Service line, stock untouched");
        return Ok(StockOutcome::Service);
    };

    if change.after < 0 {
        warn!(
            product_id = %movement.item_id,
            before = change.before,
            after = change.after,
            reason = %movement.reason,
            "Stock went negative"
        );
    }

    if floor_zero && change.applied_delta() != movement.signed_delta() {
        debug!(
            product_id = %movement.item_id,
            requested = movement.signed_delta(),
            applied = change.applied_delta(),
            "Restore clamped at zero"
        );
    }

    Ok(StockOutcome::Applied(change))
}
