//! # Status Impact Policy
//!
//! Maps free-text transaction statuses to whether the transaction currently
//! holds inventory.
//!
//! ## Commitment States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Uncommitted ──────────► Committed ──────────► Released               │
//! │   (pending)               (completed, paid,     (cancelled, returned,  │
//! │        ▲                   credit, partial,      refunded)             │
//! │        │                   delivered)                 │                 │
//! │        └──────────────────────┘ ◄────────────────────┘                 │
//! │                                                                         │
//! │   Only Committed affects stock. Every arrow is legal; the reconciler   │
//! │   decides what each one does to stock.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Matching is case-insensitive and ignores surrounding whitespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

// =============================================================================
// Types
// =============================================================================

/// Whether a status currently affects stock, and in which sense.
///
/// For purchases `reduces` reads as "adds": the direction is decided by the
/// transaction kind, this only says that stock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockImpact {
    pub affects_stock: bool,
    pub reduces: bool,
}

impl StockImpact {
    pub const HOLDS: StockImpact = StockImpact {
        affects_stock: true,
        reduces: true,
    };
    pub const NONE: StockImpact = StockImpact {
        affects_stock: false,
        reduces: false,
    };
}

/// The stock commitment of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    /// No stock taken yet.
    Uncommitted,
    /// Stock currently taken (sale) or added (purchase).
    Committed,
    /// Stock given back after a commitment, or never taken.
    Released,
}

impl Commitment {
    #[inline]
    pub fn is_committed(&self) -> bool {
        matches!(self, Commitment::Committed)
    }

    pub fn impact(&self) -> StockImpact {
        if self.is_committed() {
            StockImpact::HOLDS
        } else {
            StockImpact::NONE
        }
    }
}

/// What to do with a status nobody has listed.
///
/// The historical behaviour reduces stock for anything unrecognised; whether
/// that is the right business rule is still open, hence the knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatusPolicy {
    /// Treat unknown statuses as committed.
    #[default]
    HoldsStock,
    /// Treat unknown statuses as uncommitted.
    NoImpact,
}

impl fmt::Display for UnknownStatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownStatusPolicy::HoldsStock => write!(f, "holds_stock"),
            UnknownStatusPolicy::NoImpact => write!(f, "no_impact"),
        }
    }
}

impl FromStr for UnknownStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "holds_stock" | "holds-stock" | "committed" => Ok(UnknownStatusPolicy::HoldsStock),
            "no_impact" | "no-impact" | "uncommitted" => Ok(UnknownStatusPolicy::NoImpact),
            other => Err(format!(
                "Unknown status policy: '{}'. Valid options: holds_stock, no_impact",
                other
            )),
        }
    }
}

// =============================================================================
// Status Policy
// =============================================================================

const COMMITTED_STATUSES: &[&str] = &["completed", "delivered", "paid", "credit", "partial"];
const UNCOMMITTED_STATUSES: &[&str] = &["pending"];
const RELEASED_STATUSES: &[&str] = &["cancelled", "canceled", "returned", "refunded"];

const PURCHASE_COMMITTED_DELIVERY: &[&str] = &["delivered", "received"];
const PURCHASE_UNCOMMITTED_DELIVERY: &[&str] = &["pending", "ordered"];
const PURCHASE_RELEASED_DELIVERY: &[&str] = &["returned", "cancelled", "canceled"];

/// Classifies statuses into commitments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusPolicy {
    unknown: UnknownStatusPolicy,
}

impl StatusPolicy {
    pub fn new(unknown: UnknownStatusPolicy) -> Self {
        StatusPolicy { unknown }
    }

    pub fn unknown_status_policy(&self) -> UnknownStatusPolicy {
        self.unknown
    }

    /// `impact(status) -> {affects_stock, reduces}`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::policy::{StatusPolicy, StockImpact};
    ///
    /// let policy = StatusPolicy::default();
    /// assert_eq!(policy.impact("Completed"), StockImpact::HOLDS);
    /// assert_eq!(policy.impact(" pending "), StockImpact::NONE);
    /// ```
    pub fn impact(&self, status: &str) -> StockImpact {
        self.sale_commitment(status).impact()
    }

    /// Commitment of a sale in the given status.
    pub fn sale_commitment(&self, status: &str) -> Commitment {
        let status = normalize(status);

        if COMMITTED_STATUSES.contains(&status.as_str()) {
            Commitment::Committed
        } else if UNCOMMITTED_STATUSES.contains(&status.as_str()) {
            Commitment::Uncommitted
        } else if RELEASED_STATUSES.contains(&status.as_str()) {
            Commitment::Released
        } else {
            self.unknown_commitment()
        }
    }

    /// Commitment of a purchase.
    ///
    /// ## Gating
    /// ```text
    /// payment cancelled            → Released
    /// delivery returned/cancelled  → Released
    /// delivery delivered/received  → Committed   (stock added)
    /// delivery pending/ordered     → Uncommitted
    /// anything else                → unknown-status policy
    /// ```
    pub fn purchase_commitment(&self, delivery_status: &str, payment_status: &str) -> Commitment {
        let delivery = normalize(delivery_status);
        let payment = normalize(payment_status);

        if matches!(payment.as_str(), "cancelled" | "canceled") {
            return Commitment::Released;
        }

        if PURCHASE_RELEASED_DELIVERY.contains(&delivery.as_str()) {
            Commitment::Released
        } else if PURCHASE_COMMITTED_DELIVERY.contains(&delivery.as_str()) {
            Commitment::Committed
        } else if PURCHASE_UNCOMMITTED_DELIVERY.contains(&delivery.as_str()) {
            Commitment::Uncommitted
        } else {
            self.unknown_commitment()
        }
    }

    fn unknown_commitment(&self) -> Commitment {
        match self.unknown {
            UnknownStatusPolicy::HoldsStock => Commitment::Committed,
            UnknownStatusPolicy::NoImpact => Commitment::Uncommitted,
        }
    }
}

/// Lowercases and trims a status for comparison.
pub fn normalize(status: &str) -> String {
    status.trim().to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_status_table() {
        let policy = StatusPolicy::default();

        for status in ["completed", "delivered", "paid", "credit", "partial"] {
            assert_eq!(policy.impact(status), StockImpact::HOLDS, "{status}");
        }
        for status in ["pending", "cancelled", "returned", "refunded"] {
            assert_eq!(policy.impact(status), StockImpact::NONE, "{status}");
        }

        assert_eq!(policy.sale_commitment("pending"), Commitment::Uncommitted);
        assert_eq!(policy.sale_commitment("refunded"), Commitment::Released);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let policy = StatusPolicy::default();
        assert_eq!(policy.sale_commitment("  COMPLETED "), Commitment::Committed);
        assert_eq!(policy.sale_commitment("Cancelled"), Commitment::Released);
    }

    #[test]
    fn test_unknown_status_is_configurable() {
        let default_policy = StatusPolicy::default();
        assert_eq!(default_policy.impact("on_hold"), StockImpact::HOLDS);

        let lenient = StatusPolicy::new(UnknownStatusPolicy::NoImpact);
        assert_eq!(lenient.impact("on_hold"), StockImpact::NONE);
        assert_eq!(lenient.sale_commitment("on_hold"), Commitment::Uncommitted);
        // Known statuses are unaffected by the knob
        assert_eq!(lenient.impact("completed"), StockImpact::HOLDS);
    }

    #[test]
    fn test_purchase_gating() {
        let policy = StatusPolicy::default();

        assert_eq!(policy.purchase_commitment("delivered", "paid"), Commitment::Committed);
        assert_eq!(policy.purchase_commitment("received", "credit"), Commitment::Committed);
        assert_eq!(policy.purchase_commitment("ordered", "paid"), Commitment::Uncommitted);
        assert_eq!(policy.purchase_commitment("pending", "pending"), Commitment::Uncommitted);
        assert_eq!(policy.purchase_commitment("delivered", "cancelled"), Commitment::Released);
        assert_eq!(policy.purchase_commitment("returned", "paid"), Commitment::Released);
    }

    #[test]
    fn test_unknown_policy_parsing() {
        assert_eq!("no_impact".parse::<UnknownStatusPolicy>().unwrap(), UnknownStatusPolicy::NoImpact);
        assert_eq!("HOLDS_STOCK".parse::<UnknownStatusPolicy>().unwrap(), UnknownStatusPolicy::HoldsStock);
        assert!("sometimes".parse::<UnknownStatusPolicy>().is_err());
    }
}
