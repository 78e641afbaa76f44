//! # Sale Handlers
//!
//! Create, update and delete a sale, keeping stock, ledger and the financial
//! outbox in step with the sale's commitment.
//!
//! ## Commitment Transitions (sales)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ───────────► completed / paid / credit / partial             │
//! │  (Uncommitted)  take    (Committed)                                    │
//! │       ▲                   │      ▲                                      │
//! │       │ give back         │      │ take                                 │
//! │       └───────────────────┤      │                                      │
//! │                           ▼      │                                      │
//! │                   cancelled / returned / refunded                      │
//! │                   (Released)                                           │
//! │                                                                         │
//! │   delete: give back only if Committed                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use tally_core::validation::validate_sale_payload;
use tally_core::{
    Actor, FinancialAdjustment, FinancialEvent, NoteContext, Reconciler, ReferenceType, Sale, SalePayload,
    StateSnapshot, TransactionItem,
};
use tally_db::SaleRepository;
use tracing::{debug, info};

use crate::engine::{apply_plan, check_version, resolve_lines, InventoryEngine, TransactionOutcome};
use crate::error::{EngineError, EngineResult};
use crate::finance::{record_or_warn, FinancialRecorder};
use crate::ledger::LedgerWriter;

fn notes(sale: &Sale) -> NoteContext<'_> {
    NoteContext {
        status: Some(&sale.status),
        payment_method: Some(&sale.payment_method),
        counterparty: sale.customer_name.as_deref(),
    }
}

impl<R: FinancialRecorder> InventoryEngine<R> {
    fn sale_state(&self, sale: &Sale, items: &[TransactionItem]) -> StateSnapshot {
        StateSnapshot::from_stored(self.policy.sale_commitment(&sale.status), sale.status.clone(), items)
    }

    /// Records a new sale.
    ///
    /// Stock leaves the shelf only when the status commits it.
    pub async fn create_sale(&self, payload: &SalePayload, actor: &Actor) -> EngineResult<TransactionOutcome<Sale>> {
        debug!(status = %payload.status, items = payload.items.len(), "create_sale");
        validate_sale_payload(payload)?;

        let outcome = self
            .executor
            .run("create_sale", move |mut tx| async move {
                let result = self.create_sale_in(&mut tx, payload, actor).await;
                (tx, result)
            })
            .await?;

        info!(
            sale_id = %outcome.record.id,
            invoice = %outcome.record.invoice_number,
            status = %outcome.record.status,
            ledger_entries = outcome.ledger.len(),
            "Sale created"
        );
        Ok(outcome)
    }

    /// Replaces a sale's header and items, reconciling stock against the
    /// stored state.
    ///
    /// `expected_version = None` accepts whatever version is stored; the
    /// version guard on the write still catches concurrent writers.
    pub async fn update_sale(
        &self,
        id: &str,
        payload: &SalePayload,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Sale>> {
        debug!(sale_id = %id, status = %payload.status, ?expected_version, "update_sale");
        validate_sale_payload(payload)?;

        let outcome = self
            .executor
            .run("update_sale", move |mut tx| async move {
                let result = self.update_sale_in(&mut tx, id, payload, expected_version, actor).await;
                (tx, result)
            })
            .await?;

        info!(
            sale_id = %id,
            version = outcome.record.version,
            status = %outcome.record.status,
            ledger_entries = outcome.ledger.len(),
            "Sale updated"
        );
        Ok(outcome)
    }

    /// Deletes a sale, giving stock back if it was committed.
    ///
    /// The ledger keeps its rows; they still reference the deleted id.
    pub async fn delete_sale(
        &self,
        id: &str,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Sale>> {
        debug!(sale_id = %id, ?expected_version, "delete_sale");

        let outcome = self
            .executor
            .run("delete_sale", move |mut tx| async move {
                let result = self.delete_sale_in(&mut tx, id, expected_version, actor).await;
                (tx, result)
            })
            .await?;

        info!(
            sale_id = %id,
            status = %outcome.record.status,
            ledger_entries = outcome.ledger.len(),
            "Sale deleted"
        );
        Ok(outcome)
    }

    // =========================================================================
    // Scoped bodies
    // =========================================================================

    async fn create_sale_in(
        &self,
        conn: &mut SqliteConnection,
        payload: &SalePayload,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Sale>> {
        let lines = resolve_lines(conn, &payload.items, &[], true).await?;

        let sale = SaleRepository::insert_with(conn, payload, actor).await?;
        let items = SaleRepository::replace_items(conn, &sale.id, &lines).await?;

        let plan = Reconciler::sales().create(&self.sale_state(&sale, &items));
        let writer = LedgerWriter::new(ReferenceType::Sale, &sale.id, actor).with_notes(notes(&sale));
        let ledger = apply_plan(conn, &plan, &writer).await?;

        let adjustment = FinancialAdjustment::for_sale(&sale, &items, FinancialEvent::Created, actor);
        let financial_recorded = record_or_warn(&self.recorder, conn, &adjustment).await;

        Ok(TransactionOutcome {
            record: sale,
            items,
            ledger,
            financial_recorded,
        })
    }

    async fn update_sale_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        payload: &SalePayload,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Sale>> {
        let current = SaleRepository::find(conn, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", id))?;
        check_version("Sale", id, current.version, expected_version)?;

        let old_items = SaleRepository::items(conn, id).await?;
        let old = self.sale_state(&current, &old_items);

        let lines = resolve_lines(conn, &payload.items, &old_items, true).await?;
        let sale = SaleRepository::update_with(conn, &current, payload).await?;
        let items = SaleRepository::replace_items(conn, id, &lines).await?;

        let plan = Reconciler::sales().update(&old, &self.sale_state(&sale, &items));
        let writer = LedgerWriter::new(ReferenceType::Sale, id, actor).with_notes(notes(&sale));
        let ledger = apply_plan(conn, &plan, &writer).await?;

        let adjustment = FinancialAdjustment::for_sale(&sale, &items, FinancialEvent::Updated, actor);
        let financial_recorded = record_or_warn(&self.recorder, conn, &adjustment).await;

        Ok(TransactionOutcome {
            record: sale,
            items,
            ledger,
            financial_recorded,
        })
    }

    async fn delete_sale_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> EngineResult<TransactionOutcome<Sale>> {
        let current = SaleRepository::find(conn, id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", id))?;
        check_version("Sale", id, current.version, expected_version)?;

        let old_items = SaleRepository::items(conn, id).await?;
        let old = self.sale_state(&current, &old_items);

        SaleRepository::delete_with(conn, id, current.version).await?;

        let plan = Reconciler::sales().delete(&old);
        let writer = LedgerWriter::new(ReferenceType::Sale, id, actor).with_notes(notes(&current));
        let ledger = apply_plan(conn, &plan, &writer).await?;

        let adjustment = FinancialAdjustment::for_sale(&current, &old_items, FinancialEvent::Deleted, actor);
        let financial_recorded = record_or_warn(&self.recorder, conn, &adjustment).await;

        Ok(TransactionOutcome {
            record: current,
            items: old_items,
            ledger,
            financial_recorded,
        })
    }
}
