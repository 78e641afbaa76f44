//! # Purchase Handlers
//!
//! Mirror of the sale handlers with stock flowing the other way: a committed
//! purchase brings stock in, releasing or deleting it takes that stock out
//! again.
//!
//! A purchase commits on its delivery status; a cancelled payment releases
//! it regardless of delivery.

use sqlx::SqliteConnection;
use tally_core::validation::validate_purchase_payload;
use tally_core::{
    Actor, FinancialAdjustment, FinancialEvent, NoteContext, Purchase, PurchasePayload, Reconciler, ReferenceType,
    StateSnapshot, TransactionItem,
};
use tally_db::PurchaseRepository;
use tracing::{debug, info};

use crate::engine::{apply_plan, check_version, resolve_lines, InventoryEngine, TransactionOutcome};
use crate::error::{EngineError, EngineResult};
use crate::finance::{record_or_warn, FinancialRecorder};
use crate::ledger::LedgerWriter;

/// Combined status text, e.g. `delivered/paid`.
fn status_of(purchase: &Purchase) -> String {
    format!("{}/{}", purchase.delivery_status, purchase.payment_status)
}

impl<R: FinancialRecorder> InventoryEngine<R> {
    fn purchase_state(&self, purchase: &Purchase, items: &[TransactionItem]) -> StateSnapshot {
        let commitment = self
            .policy
            .purchase_commitment(&purchase.delivery_status, &purchase.payment_status);
        StateSnapshot::from_stored(commitment, status_of(purchase), items)
    }

    /// Records a new purchase. Stock arrives only once delivered.
    pub async fn create_purchase(
        &self,
        payload: &PurchasePayload,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Purchase>> {
        debug!(
            delivery = %payload.delivery_status,
            payment = %payload.payment_status,
            items = payload.items.len(),
            "create_purchase"
        );
        validate_purchase_payload(payload)?;

        let outcome = self
            .executor
            .run("create_purchase", move |mut tx| async move {
                let result = self.create_purchase_in(&mut tx, payload, actor).await;
                (tx, result)
            })
            .await?;

        info!(
            purchase_id = %outcome.record.id,
            reference = %outcome.record.reference_number,
            delivery = %outcome.record.delivery_status,
            ledger_entries = outcome.ledger.len(),
            "Purchase created"
        );
        Ok(outcome)
    }

    /// Replaces a purchase's header and items, reconciling stock.
    pub async fn update_purchase(
        &self,
        id: &str,
        payload: &PurchasePayload,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Purchase>> {
        debug!(purchase_id = %id, delivery = %payload.delivery_status, ?expected_version, "update_purchase");
        validate_purchase_payload(payload)?;

        let outcome = self
            .executor
            .run("update_purchase", move |mut tx| async move {
                let result = self.update_purchase_in(&mut tx, id, payload, expected_version, actor).await;
                (tx, result)
            })
            .await?;

        info!(
            purchase_id = %id,
            version = outcome.record.version,
            delivery = %outcome.record.delivery_status,
            ledger_entries = outcome.ledger.len(),
            "Purchase updated"
        );
        Ok(outcome)
    }

    /// Deletes a purchase, removing its stock if it had been received.
    pub async fn delete_purchase(
        &self,
        id: &str,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Purchase>> {
        debug!(purchase_id = %id, ?expected_version, "delete_purchase");

        let outcome = self
            .executor
            .run("delete_purchase", move |mut tx| async move {
                let result = self.delete_purchase_in(&mut tx, id, expected_version, actor).await;
                (tx, result)
            })
            .await?;

        info!(purchase_id = %id, ledger_entries = outcome.ledger.len(), "Purchase deleted");
        Ok(outcome)
    }

    // =========================================================================
    // Scoped bodies
    // =========================================================================

    async fn create_purchase_in(
        &self,
        conn: &mut SqliteConnection,
        payload: &PurchasePayload,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Purchase>> {
        let lines = resolve_lines(conn, &payload.items, &[], false).await?;

        let purchase = PurchaseRepository::insert_with(conn, payload, actor).await?;
        let items = PurchaseRepository::replace_items(conn, &purchase.id, &lines).await?;

        let plan = Reconciler::purchases().create(&self.purchase_state(&purchase, &items));
        let status = status_of(&purchase);
        let writer = LedgerWriter::new(ReferenceType::Purchase, &purchase.id, actor).with_notes(NoteContext {
            status: Some(&status),
            payment_method: Some(&purchase.payment_method),
            counterparty: purchase.supplier_name.as_deref(),
        });
        let ledger = apply_plan(conn, &plan, &writer).await?;

        let adjustment = FinancialAdjustment::for_purchase(&purchase, &items, FinancialEvent::Created, actor);
        let financial_recorded = record_or_warn(&self.recorder, conn, &adjustment).await;

        Ok(TransactionOutcome {
            record: purchase,
            items,
            ledger,
            financial_recorded,
        })
    }

    async fn update_purchase_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        payload: &PurchasePayload,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Purchase>> {
        let current = PurchaseRepository::find(conn, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Purchase", id))?;
        check_version("Purchase", id, current.version, expected_version)?;

        let old_items = PurchaseRepository::items(conn, id).await?;
        let old = self.purchase_state(&current, &old_items);

        let lines = resolve_lines(conn, &payload.items, &old_items, false).await?;
        let purchase = PurchaseRepository::update_with(conn, &current, payload).await?;
        let items = PurchaseRepository::replace_items(conn, id, &lines).await?;

        let plan = Reconciler::purchases().update(&old, &self.purchase_state(&purchase, &items));
        let status = status_of(&purchase);
        let writer = LedgerWriter::new(ReferenceType::Purchase, id, actor).with_notes(NoteContext {
            status: Some(&status),
            payment_method: Some(&purchase.payment_method),
            counterparty: purchase.supplier_name.as_deref(),
        });
        let ledger = apply_plan(conn, &plan, &writer).await?;

        let adjustment = FinancialAdjustment::for_purchase(&purchase, &items, FinancialEvent::Updated, actor);
        let financial_recorded = record_or_warn(&self.recorder, conn, &adjustment).await;

        Ok(TransactionOutcome {
            record: purchase,
            items,
            ledger,
            financial_recorded,
        })
    }

    async fn delete_purchase_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Purchase>> {
        let current = PurchaseRepository::find(conn, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Purchase", id))?;
        check_version("Purchase", id, current.version, expected_version)?;

        let old_items = PurchaseRepository::items(conn, id).await?;
        let old = self.purchase_state(&current, &old_items);

        PurchaseRepository::delete_with(conn, id, current.version).await?;

        let plan = Reconciler::purchases().delete(&old);
        let status = status_of(&current);
        let writer = LedgerWriter::new(ReferenceType::Purchase, id, actor).with_notes(NoteContext {
            status: Some(&status),
            payment_method: Some(&current.payment_method),
            counterparty: current.supplier_name.as_deref(),
        });
        let ledger = apply_plan(conn, &plan, &writer).await?;

        let adjustment = FinancialAdjustment::for_purchase(&current, &old_items, FinancialEvent::Deleted, actor);
        let financial_recorded = record_or_warn(&self.recorder, conn, &adjustment).await;

        Ok(TransactionOutcome {
            record: current,
            items: old_items,
            ledger,
            financial_recorded,
        })
    }
}
