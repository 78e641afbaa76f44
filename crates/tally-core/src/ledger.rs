//! # Stock Ledger Vocabulary
//!
//! The append-only history of every change to a product's stock.
//!
//! ## Ledger Completeness
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every product:                                                     │
//! │                                                                         │
//! │     Σ  direction.sign() × quantity   ==   stock(now) − stock(inception) │
//! │   entries                                                               │
//! │                                                                         │
//! │  • quantity is always a magnitude (≥ 0)                                │
//! │  • direction says which way it moved: out (−), in (+), none (0)        │
//! │  • zero-quantity entries record noteworthy no-ops                      │
//! │    (pending create, pending → cancelled, deleting a pending sale)      │
//! │  • entries are never updated or deleted; a reversal is a new entry     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::{ReferenceType, TransactionKind};

// =============================================================================
// Direction
// =============================================================================

/// Which way stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    /// Stock left the shelf (sale, purchase reversal, shrinkage).
    Out,
    /// Stock arrived (purchase, sale reversal, count correction).
    In,
    /// Nothing moved; the entry only documents a transition.
    #[serde(rename = "none")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "none"))]
    Unchanged,
}

impl StockDirection {
    /// `-1`, `+1` or `0`.
    #[inline]
    pub fn sign(&self) -> i64 {
        match self {
            StockDirection::Out => -1,
            StockDirection::In => 1,
            StockDirection::Unchanged => 0,
        }
    }

    /// Direction of a signed delta.
    pub fn of_delta(delta: i64) -> Self {
        match delta.signum() {
            -1 => StockDirection::Out,
            1 => StockDirection::In,
            _ => StockDirection::Unchanged,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockDirection::Out => "out",
            StockDirection::In => "in",
            StockDirection::Unchanged => "none",
        }
    }
}

// =============================================================================
// Reason Codes
// =============================================================================

/// Why a ledger entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    // Purchases
    Purchase,
    PurchasePending,
    PurchaseCancelled,
    PurchaseReturned,
    PurchaseStatusChanged,
    PurchaseItemIncreased,
    PurchaseItemDecreased,
    PurchaseItemAdded,
    PurchaseItemRemoved,
    PurchaseDeleted,

    // Sales
    SaleCompleted,
    SalePending,
    SaleCancelled,
    SaleReturned,
    SaleStatusChanged,
    SaleItemIncreased,
    SaleItemDecreased,
    SaleItemAdded,
    SaleItemRemoved,
    SaleDeleted,

    /// Manual correction outside any transaction.
    Adjustment,
}

impl LedgerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerReason::Purchase => "purchase",
            LedgerReason::PurchasePending => "purchase_pending",
            LedgerReason::PurchaseCancelled => "purchase_cancelled",
            LedgerReason::PurchaseReturned => "purchase_returned",
            LedgerReason::PurchaseStatusChanged => "purchase_status_changed",
            LedgerReason::PurchaseItemIncreased => "purchase_item_increased",
            LedgerReason::PurchaseItemDecreased => "purchase_item_decreased",
            LedgerReason::PurchaseItemAdded => "purchase_item_added",
            LedgerReason::PurchaseItemRemoved => "purchase_item_removed",
            LedgerReason::PurchaseDeleted => "purchase_deleted",
            LedgerReason::SaleCompleted => "sale_completed",
            LedgerReason::SalePending => "sale_pending",
            LedgerReason::SaleCancelled => "sale_cancelled",
            LedgerReason::SaleReturned => "sale_returned",
            LedgerReason::SaleStatusChanged => "sale_status_changed",
            LedgerReason::SaleItemIncreased => "sale_item_increased",
            LedgerReason::SaleItemDecreased => "sale_item_decreased",
            LedgerReason::SaleItemAdded => "sale_item_added",
            LedgerReason::SaleItemRemoved => "sale_item_removed",
            LedgerReason::SaleDeleted => "sale_deleted",
            LedgerReason::Adjustment => "adjustment",
        }
    }

    /// The transaction kind the reason belongs to, `None` for adjustments.
    pub fn kind(&self) -> Option<TransactionKind> {
        match self {
            LedgerReason::Adjustment => None,
            LedgerReason::Purchase
            | LedgerReason::PurchasePending
            | LedgerReason::PurchaseCancelled
            | LedgerReason::PurchaseReturned
            | LedgerReason::PurchaseStatusChanged
            | LedgerReason::PurchaseItemIncreased
            | LedgerReason::PurchaseItemDecreased
            | LedgerReason::PurchaseItemAdded
            | LedgerReason::PurchaseItemRemoved
            | LedgerReason::PurchaseDeleted => Some(TransactionKind::Purchase),
            _ => Some(TransactionKind::Sale),
        }
    }
}

impl fmt::Display for LedgerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    /// Magnitude of the applied change (never negative).
    pub quantity: i64,
    pub direction: StockDirection,
    pub reason: LedgerReason,
    pub reference_type: ReferenceType,
    /// Survives deletion of the referenced transaction.
    pub reference_id: String,
    pub note: Option<String>,
    pub user_id: String,
    pub device_id: String,
    /// Product stock right after this movement.
    pub stock_after: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed effect on stock.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.direction.sign() * self.quantity
    }
}

/// Sums the signed effect of a set of entries.
pub fn net_change<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i64 {
    entries.into_iter().map(LedgerEntry::signed_quantity).sum()
}

// =============================================================================
// Note Enrichment
// =============================================================================

/// Labels appended to ledger notes for audit readability.
///
/// Presentation only: nothing parses these back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteContext<'a> {
    pub status: Option<&'a str>,
    pub payment_method: Option<&'a str>,
    /// Customer on sales, supplier on purchases.
    pub counterparty: Option<&'a str>,
}

impl<'a> NoteContext<'a> {
    /// Builds the final note from the movement detail.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::ledger::NoteContext;
    ///
    /// let ctx = NoteContext {
    ///     status: Some("completed"),
    ///     payment_method: Some("cash"),
    ///     counterparty: Some("Ayesha"),
    /// };
    /// assert_eq!(
    ///     ctx.enrich("Sale completed"),
    ///     "Sale completed | status: completed | payment: cash | party: Ayesha"
    /// );
    /// ```
    pub fn enrich(&self, detail: &str) -> String {
        let mut note = detail.to_string();

        let labels = [
            ("status", self.status),
            ("payment", self.payment_method),
            ("party", self.counterparty),
        ];
        for (label, value) in labels {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                note.push_str(&format!(" | {}: {}", label, value));
            }
        }

        note
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
