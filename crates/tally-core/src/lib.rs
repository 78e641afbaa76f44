//! # tally-core: Pure Business Logic for Tally
//!
//! Everything that decides *what* should happen to stock when a sale or a
//! purchase is created, edited or deleted. No I/O lives here; the database
//! layer and the engine feed snapshots in and carry the resulting plans out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Request handlers (back-office CRUD)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-engine (InventoryEngine)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌───────────┐ ┌──────────┐ ┌──────────────────┐ │   │
//! │  │   │  policy  │ │ reconcile │ │  ledger  │ │ finance / money  │ │   │
//! │  │   │ status → │ │ old × new │ │ reasons  │ │ COGS, outstanding│ │   │
//! │  │   │ commit   │ │ → plan    │ │ notes    │ │                  │ │   │
//! │  │   └──────────┘ └───────────┘ └──────────┘ └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Stored records and request payloads (Product, Sale, Purchase, ...)
//! - [`policy`] - Status string → stock commitment
//! - [`reconcile`] - The commitment state machine producing stock movements
//! - [`ledger`] - Ledger entry, reason codes, note enrichment
//! - [`finance`] - Financial adjustment figures handed to accounting
//! - [`money`] - Integer-cent money
//! - [`validation`] - Payload validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::policy::{Commitment, StatusPolicy};
//! use tally_core::reconcile::{LineQuantity, Reconciler, StateSnapshot};
//!
//! let policy = StatusPolicy::default();
//! let state = StateSnapshot::new(
//!     policy.sale_commitment("completed"),
//!     "completed",
//!     vec![LineQuantity::new("coke", 3)],
//! );
//! assert_eq!(state.commitment, Commitment::Committed);
//!
//! let plan = Reconciler::sales().create(&state);
//! assert_eq!(plan.len(), 1);
//! assert_eq!(plan[0].quantity, 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod finance;
pub mod ledger;
pub mod money;
pub mod policy;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use finance::{FinancialAdjustment, FinancialEvent};
pub use ledger::{LedgerEntry, LedgerReason, NoteContext, StockDirection};
pub use money::Money;
pub use policy::{Commitment, StatusPolicy, StockImpact, UnknownStatusPolicy};
pub use reconcile::{MovementMode, Reconciler, StateSnapshot, StockMovement};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID (single-tenant runtime with multi-tenant schema).
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum line items accepted on a single sale or purchase.
pub const MAX_LINE_ITEMS: usize = 500;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typos such as 100000 instead of 100 on a purchase order.
pub const MAX_ITEM_QUANTITY: i64 = 99_999;

/// Maximum unit price or unit cost on a line, in cents.
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_LINE_ITEMS`] this keeps every line
/// total and transaction sum well inside `i64`.
pub const MAX_UNIT_CENTS: i64 = 10_000_000_000;
