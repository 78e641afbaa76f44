//! # Financial Adjustments
//!
//! The figures handed to accounting for every sale or purchase mutation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total        what the customer owes / what we owe the supplier         │
//! │  cogs         Σ quantity × unit cost  (sales: cost snapshot;            │
//! │                                        purchases: unit purchase price)  │
//! │  received     received (sale) / paid (purchase)                         │
//! │  outstanding  max(0, total − received)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A delete carries the figures of the record as it was, so accounting can
//! reverse them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Actor, Purchase, Sale, TransactionItem, TransactionKind};

/// Which mutation produced the adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FinancialEvent {
    Created,
    Updated,
    Deleted,
}

impl FinancialEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialEvent::Created => "created",
            FinancialEvent::Updated => "updated",
            FinancialEvent::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FinancialEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for the financial adjustment recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialAdjustment {
    pub transaction_id: String,
    pub transaction_type: TransactionKind,
    pub event: FinancialEvent,
    pub status: String,
    pub payment_method: String,
    pub total_cents: i64,
    pub cogs_cents: i64,
    pub received_cents: i64,
    pub outstanding_cents: i64,
    pub tenant_id: String,
    pub user_id: String,
    pub device_id: String,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

impl FinancialAdjustment {
    /// Figures for a sale. COGS comes from each line's cost snapshot.
    pub fn for_sale(sale: &Sale, items: &[TransactionItem], event: FinancialEvent, actor: &Actor) -> Self {
        let total = Money::from_cents(sale.total_cents);
        let received = Money::from_cents(sale.received_cents);

        FinancialAdjustment {
            transaction_id: sale.id.clone(),
            transaction_type: TransactionKind::Sale,
            event,
            status: sale.status.clone(),
            payment_method: sale.payment_method.clone(),
            total_cents: total.cents(),
            cogs_cents: cost_of_goods(items).cents(),
            received_cents: received.cents(),
            outstanding_cents: outstanding(total, received).cents(),
            tenant_id: actor.tenant_id.clone(),
            user_id: actor.user_id.clone(),
            device_id: actor.device_id.clone(),
            occurred_at: Utc::now(),
        }
    }

    /// Figures for a purchase. COGS is the inventory value bought.
    pub fn for_purchase(purchase: &Purchase, items: &[TransactionItem], event: FinancialEvent, actor: &Actor) -> Self {
        let total = Money::from_cents(purchase.total_cents);
        let paid = Money::from_cents(purchase.paid_cents);
        let inventory_value: Money = items
            .iter()
            .map(|item| Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity))
            .sum();

        FinancialAdjustment {
            transaction_id: purchase.id.clone(),
            transaction_type: TransactionKind::Purchase,
            event,
            status: format!("{}/{}", purchase.delivery_status, purchase.payment_status),
            payment_method: purchase.payment_method.clone(),
            total_cents: total.cents(),
            cogs_cents: inventory_value.cents(),
            received_cents: paid.cents(),
            outstanding_cents: outstanding(total, paid).cents(),
            tenant_id: actor.tenant_id.clone(),
            user_id: actor.user_id.clone(),
            device_id: actor.device_id.clone(),
            occurred_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Σ quantity × unit cost snapshot; lines without a snapshot cost nothing.
pub fn cost_of_goods(items: &[TransactionItem]) -> Money {
    items
        .iter()
        .map(|item| Money::from_cents(item.unit_cost_cents.unwrap_or(0)).multiply_quantity(item.quantity))
        .sum()
}

/// `max(0, total − received)`.
#[inline]
pub fn outstanding(total: Money, received: Money) -> Money {
    (total - received).floor_zero()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, price: i64, cost: Option<i64>) -> TransactionItem {
        TransactionItem {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: "t".to_string(),
            item_id: "p".to_string(),
            quantity,
            unit_price_cents: price,
            unit_cost_cents: cost,
            created_at: Utc::now(),
        }
    }

    fn sale(total: i64, received: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s1".to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            invoice_number: "INV-1".to_string(),
            status: "credit".to_string(),
            payment_method: "cash".to_string(),
            total_cents: total,
            received_cents: received,
            customer_name: None,
            user_id: "u".to_string(),
            device_id: "d".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_cogs_uses_cost_snapshot() {
        let items = vec![item(3, 500, Some(300)), item(2, 900, None)];
        assert_eq!(cost_of_goods(&items).cents(), 900);
    }

    #[test]
    fn test_sale_adjustment_figures() {
        let actor = Actor::new("cashier-1", "till-1");
        let items = vec![item(2, 500, Some(350))];
        let adj = FinancialAdjustment::for_sale(&sale(1000, 400), &items, FinancialEvent::Created, &actor);

        assert_eq!(adj.total_cents, 1000);
        assert_eq!(adj.cogs_cents, 700);
        assert_eq!(adj.received_cents, 400);
        assert_eq!(adj.outstanding_cents, 600);
        assert_eq!(adj.user_id, "cashier-1");
    }

    #[test]
    fn test_cogs_saturates_on_oversized_costs() {
        // Stored catalog costs are not bounded by payload validation
        let items = vec![item(3, 100, Some(i64::MAX / 2)), item(1, 100, Some(10))];
        assert_eq!(cost_of_goods(&items).cents(), i64::MAX);
    }

    #[test]
    fn test_outstanding_never_negative() {
        assert_eq!(outstanding(Money::from_cents(100), Money::from_cents(150)), Money::zero());
    }

    #[test]
    fn test_payload_json_is_snake_case() {
        let actor = Actor::new("u", "d");
        let adj = FinancialAdjustment::for_sale(&sale(100, 100), &[], FinancialEvent::Deleted, &actor);
        let json = adj.to_json().unwrap();
        assert!(json.contains("\"event\":\"deleted\""));
        assert!(json.contains("\"transaction_type\":\"sale\""));
    }
}
