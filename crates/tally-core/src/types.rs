//! # Domain Types
//!
//! Records the engine stores and the payloads callers hand it.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog (read + stock column only)                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    Product      │   │    Service      │   ← inventory-inert         │
//! │  │  stock (i64)    │   │  no stock       │                             │
//! │  │  cost_cents     │   │                 │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  Transactions (owned by the engine)                                    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Purchase     │   │ TransactionItem │       │
//! │  │  status         │   │  delivery /     │   │  item_id        │       │
//! │  │  received_cents │   │  payment status │   │  quantity > 0   │       │
//! │  │  version        │   │  version        │   │  unit cost snap │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Payloads (what callers send)                                          │
//! │  SalePayload, PurchasePayload, LineItemInput, Actor                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status fields stay free text: the back office has accumulated many
//! spellings over time and [`crate::policy::StatusPolicy`] classifies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::DEFAULT_TENANT_ID;

// =============================================================================
// Kinds
// =============================================================================

/// Which side of the business a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Purchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Purchase => "purchase",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a ledger entry points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Sale,
    Purchase,
    /// Manual stock count correction.
    Adjustment,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Sale => "sale",
            ReferenceType::Purchase => "purchase",
            ReferenceType::Adjustment => "adjustment",
        }
    }
}

impl From<TransactionKind> for ReferenceType {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Sale => ReferenceType::Sale,
            TransactionKind::Purchase => ReferenceType::Purchase,
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a catalog id referenced by a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Stock-tracked.
    Product,
    /// Sellable but never touches stock or the ledger.
    Service,
}

/// Result of a catalog lookup: enough to classify a line and price its COGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogRef {
    pub kind: ItemKind,
    /// Cost basis in cents; always zero for services.
    pub cost_cents: i64,
}

// =============================================================================
// Catalog
// =============================================================================

/// A stock-tracked product.
///
/// Owned by the catalog. The engine only ever changes `stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    /// Cost basis used for COGS when a line carries no cost snapshot.
    pub cost_cents: i64,
    /// On-hand count. Negative values are a tolerated anomaly (oversold).
    pub stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub sync_version: i64,
}

impl Product {
    /// Builds a new active product owned by the default tenant.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price_cents: i64, cost_cents: i64, stock: i64) -> Self {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            sku: sku.into(),
            name: name.into(),
            price_cents,
            cost_cents,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }
}

/// A sellable service (labour, delivery fee, ...). Inventory-inert.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Service {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: name.into(),
            price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// A sale header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub invoice_number: String,
    /// Free text: completed, pending, credit, cancelled, ...
    pub status: String,
    pub payment_method: String,
    pub total_cents: i64,
    pub received_cents: i64,
    pub customer_name: Option<String>,
    pub user_id: String,
    pub device_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
}

/// A purchase (goods received from a supplier).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub tenant_id: String,
    pub reference_number: String,
    pub supplier_name: Option<String>,
    /// pending, ordered, delivered, received, returned, cancelled, ...
    pub delivery_status: String,
    /// paid, partial, credit, pending, cancelled, ...
    pub payment_status: String,
    pub payment_method: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub user_id: String,
    pub device_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// A stored line item of a sale or purchase.
///
/// Uses the snapshot pattern: `unit_cost_cents` freezes the cost basis at the
/// time the line was written so later catalog edits don't rewrite COGS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    /// Sale or purchase id.
    pub transaction_id: String,
    /// Product or service id.
    pub item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Converts a stored row back into payload form (keeps its id).
    pub fn to_input(&self) -> LineItemInput {
        LineItemInput {
            id: Some(self.id.clone()),
            item_id: self.item_id.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            unit_cost_cents: self.unit_cost_cents,
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// A line item as sent by the caller.
///
/// Identity is stable across updates only when `id` names an existing line of
/// the same transaction; anything else is inserted as a new line, and stored
/// lines missing from the payload are deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemInput {
    #[serde(default)]
    pub id: Option<String>,
    pub item_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub unit_cost_cents: Option<i64>,
}

impl LineItemInput {
    pub fn new(item_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        LineItemInput {
            id: None,
            item_id: item_id.into(),
            quantity,
            unit_price_cents,
            unit_cost_cents: None,
        }
    }

    /// Keeps the identity of an existing line.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_unit_cost(mut self, unit_cost_cents: i64) -> Self {
        self.unit_cost_cents = Some(unit_cost_cents);
        self
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// New state of a sale (create or full update).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePayload {
    /// Generated when absent.
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub status: String,
    pub payment_method: String,
    pub items: Vec<LineItemInput>,
    pub total_cents: i64,
    pub received_cents: i64,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SalePayload {
    /// Payload whose total is the sum of its lines and is fully paid.
    pub fn new(status: impl Into<String>, payment_method: impl Into<String>, items: Vec<LineItemInput>) -> Self {
        let total: Money = items.iter().map(LineItemInput::line_total).sum();
        SalePayload {
            invoice_number: None,
            status: status.into(),
            payment_method: payment_method.into(),
            items,
            total_cents: total.cents(),
            received_cents: total.cents(),
            customer_name: None,
            notes: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_received(mut self, received_cents: i64) -> Self {
        self.received_cents = received_cents;
        self
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }
}

/// New state of a purchase (create or full update).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchasePayload {
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    pub delivery_status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub items: Vec<LineItemInput>,
    pub total_cents: i64,
    pub paid_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PurchasePayload {
    /// Payload whose total is the sum of its lines and is fully paid.
    pub fn new(delivery_status: impl Into<String>, payment_status: impl Into<String>, items: Vec<LineItemInput>) -> Self {
        let total: Money = items.iter().map(LineItemInput::line_total).sum();
        PurchasePayload {
            reference_number: None,
            supplier_name: None,
            delivery_status: delivery_status.into(),
            payment_status: payment_status.into(),
            payment_method: "cash".to_string(),
            items,
            total_cents: total.cents(),
            paid_cents: total.cents(),
            notes: None,
        }
    }

    pub fn with_delivery_status(mut self, status: impl Into<String>) -> Self {
        self.delivery_status = status.into();
        self
    }

    pub fn with_payment_status(mut self, status: impl Into<String>) -> Self {
        self.payment_status = status.into();
        self
    }

    pub fn with_supplier(mut self, name: impl Into<String>) -> Self {
        self.supplier_name = Some(name.into());
        self
    }
}

/// Who is performing an operation.
///
/// The device id is opaque; it is recorded, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub tenant_id: String,
    pub user_id: String,
    pub device_id: String,
}

impl Actor {
    /// Actor on the default tenant.
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Actor {
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            user_id: user_id.into(),
            device_id: device_id.into(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }
}

// =============================================================================
// Financial Outbox
// =============================================================================

/// A financial adjustment waiting to be picked up by accounting.
///
/// Written in the same database transaction as the stock change, processed
/// out of band.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FinancialOutboxEntry {
    pub id: String,
    pub tenant_id: String,
    pub transaction_type: TransactionKind,
    pub transaction_id: String,
    /// created, updated, deleted
    pub event: String,
    /// The full [`crate::finance::FinancialAdjustment`] as JSON.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_payload_totals_from_lines() {
        let payload = SalePayload::new(
            "completed",
            "cash",
            vec![LineItemInput::new("a", 2, 150), LineItemInput::new("b", 1, 700)],
        );
        assert_eq!(payload.total_cents, 1000);
        assert_eq!(payload.received_cents, 1000);
    }

    #[test]
    fn test_item_round_trips_to_input() {
        let item = TransactionItem {
            id: "line-1".to_string(),
            transaction_id: "sale-1".to_string(),
            item_id: "coke".to_string(),
            quantity: 3,
            unit_price_cents: 199,
            unit_cost_cents: Some(120),
            created_at: Utc::now(),
        };
        let input = item.to_input();
        assert_eq!(input.id.as_deref(), Some("line-1"));
        assert_eq!(input.unit_cost_cents, Some(120));
    }

    #[test]
    fn test_reference_type_from_kind() {
        assert_eq!(ReferenceType::from(TransactionKind::Sale), ReferenceType::Sale);
        assert_eq!(ReferenceType::from(TransactionKind::Purchase).to_string(), "purchase");
    }

    #[test]
    fn test_payload_deserializes_with_defaults() {
        let json = r#"{
            "status": "pending",
            "payment_method": "card",
            "items": [{ "item_id": "coke", "quantity": 2 }],
            "total_cents": 0,
            "received_cents": 0
        }"#;
        let payload: SalePayload = serde_json::from_str(json).unwrap();
        assert!(payload.invoice_number.is_none());
        assert_eq!(payload.items[0].unit_price_cents, 0);
        assert!(payload.items[0].id.is_none());
    }
}
