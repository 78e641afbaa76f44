//! # Ledger Writer
//!
//! Turns an applied movement into an immutable ledger row.
//!
//! A failed append is logged and skipped: the stock change it describes
//! still commits with the rest of the scope.

use chrono::Utc;
use sqlx::SqliteConnection;
use tally_core::{Actor, LedgerEntry, NoteContext, ReferenceType, StockDirection, StockMovement};
use tally_db::LedgerRepository;
use tracing::warn;
use uuid::Uuid;

use crate::stock::StockOutcome;

/// Writes ledger rows for one transaction (or adjustment) reference.
#[derive(Debug, Clone, Copy)]
pub struct LedgerWriter<'a> {
    pub reference_type: ReferenceType,
    pub reference_id: &'a str,
    pub actor: &'a Actor,
    pub notes: NoteContext<'a>,
}

impl<'a> LedgerWriter<'a> {
    pub fn new(reference_type: ReferenceType, reference_id: &'a str, actor: &'a Actor) -> Self {
        LedgerWriter {
            reference_type,
            reference_id,
            actor,
            notes: NoteContext::default(),
        }
    }

    pub fn with_notes(mut self, notes: NoteContext<'a>) -> Self {
        self.notes = notes;
        self
    }

    /// Builds the row for `movement` given what the mutator did.
    ///
    /// `None` for services: they never appear in the ledger.
    pub fn entry_for(&self, movement: &StockMovement, outcome: &StockOutcome) -> Option<LedgerEntry> {
        let applied = match outcome {
            StockOutcome::Service => return None,
            other => other.applied_delta(),
        };

        Some(LedgerEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.actor.tenant_id.clone(),
            product_id: movement.item_id.clone(),
            quantity: applied.abs(),
            direction: StockDirection::of_delta(applied),
            reason: movement.reason,
            reference_type: self.reference_type,
            reference_id: self.reference_id.to_string(),
            note: Some(self.notes.enrich(&movement.detail)),
            user_id: self.actor.user_id.clone(),
            device_id: self.actor.device_id.clone(),
            stock_after: outcome.stock_after(),
            created_at: Utc::now(),
        })
    }

    /// Appends the row for `movement`; `None` when skipped or failed.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        movement: &StockMovement,
        outcome: &StockOutcome,
    ) -> Option<LedgerEntry> {
        let entry = self.entry_for(movement, outcome)?;

        match LedgerRepository::append(conn, &entry).await {
            Ok(()) => Some(entry),
            Err(e) => {
                warn!(
                    product_id = %entry.product_id,
                    reference_id = %entry.reference_id,
                    reason = %entry.reason,
                    error = %e,
                    "Ledger append failed, continuing"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{LedgerReason, MovementMode};
    use tally_db::StockChange;

    fn restore() -> StockMovement {
        StockMovement {
            item_id: "p-1".to_string(),
            direction: StockDirection::In,
            quantity: 3,
            mode: MovementMode::Reversal,
            reason: LedgerReason::SaleReturned,
            detail: "Stock restored".to_string(),
        }
    }

    #[test]
    fn test_entry_records_applied_change() {
        let actor = Actor::new("u-1", "till-1");
        let writer = LedgerWriter::new(ReferenceType::Sale, "s-1", &actor).with_notes(NoteContext {
            status: Some("returned"),
            payment_method: Some("cash"),
            counterparty: None,
        });

        // Requested +3 from -5, the clamp lifts stock to 0
        let outcome = StockOutcome::Applied(StockChange { before: -5, after: 0 });
        let entry = writer.entry_for(&restore(), &outcome).unwrap();

        assert_eq!(entry.quantity, 5);
        assert_eq!(entry.direction, StockDirection::In);
        assert_eq!(entry.stock_after, Some(0));
        assert_eq!(entry.note.as_deref(), Some("Stock restored | status: returned | payment: cash"));
    }

    #[test]
    fn test_services_and_noops() {
        let actor = Actor::new("u-1", "till-1");
        let writer = LedgerWriter::new(ReferenceType::Sale, "s-1", &actor);

        assert!(writer.entry_for(&restore(), &StockOutcome::Service).is_none());

        let entry = writer
            .entry_for(&restore(), &StockOutcome::Unchanged { stock: 9 })
            .unwrap();
        assert_eq!(entry.quantity, 0);
        assert_eq!(entry.direction, StockDirection::Unchanged);
        assert_eq!(entry.stock_after, Some(9));
    }
}
