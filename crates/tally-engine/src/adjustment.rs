//! # Manual Stock Adjustments
//!
//! Count corrections outside any sale or purchase: breakage, shrinkage, a
//! recount. Same mutator and ledger path as transactions, with the
//! `adjustment` reason and a mandatory note. No financial adjustment is
//! produced.

use serde::Serialize;
use sqlx::SqliteConnection;
use tally_core::validation::validate_adjustment;
use tally_core::{
    Actor, CoreError, ItemKind, LedgerEntry, LedgerReason, MovementMode, ReferenceType, StockDirection,
    StockMovement,
};
use tally_db::CatalogRepository;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::InventoryEngine;
use crate::error::EngineResult;
use crate::finance::FinancialRecorder;
use crate::ledger::LedgerWriter;
use crate::stock::{self, StockOutcome};

/// Result of [`InventoryEngine::adjust_stock`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    /// Groups the ledger row; query it with `ReferenceType::Adjustment`.
    pub reference_id: String,
    pub product_id: String,
    pub stock_before: i64,
    pub stock_after: i64,
    /// `None` if the ledger append failed.
    pub entry: Option<LedgerEntry>,
}

impl<R: FinancialRecorder> InventoryEngine<R> {
    /// Adds (`delta > 0`) or removes (`delta < 0`) stock by hand.
    ///
    /// ## Errors
    /// - `Validation` - zero or oversized delta, empty note
    /// - `Core(UnknownItem)` - no such product or service
    /// - `Core(NotStockTracked)` - the id is a service
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        delta: i64,
        note: &str,
        actor: &Actor,
    ) -> EngineResult<StockAdjustment> {
        debug!(product_id = %product_id, delta, "adjust_stock");
        validate_adjustment(delta, note)?;

        let adjustment = self
            .executor
            .run("adjust_stock", move |mut tx| async move {
                let result = adjust_in(&mut tx, product_id, delta, note, actor).await;
                (tx, result)
            })
            .await?;

        info!(
            product_id = %product_id,
            delta,
            before = adjustment.stock_before,
            after = adjustment.stock_after,
            "Stock adjusted"
        );
        Ok(adjustment)
    }
}

async fn adjust_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    note: &str,
    actor: &Actor,
) -> EngineResult<StockAdjustment> {
    match CatalogRepository::classify(conn, product_id).await? {
        None => return Err(CoreError::UnknownItem(product_id.to_string()).into()),
        Some(catalog) if catalog.kind == ItemKind::Service => {
            return Err(CoreError::NotStockTracked(product_id.to_string()).into())
        }
        Some(_) => {}
    }

    let movement = StockMovement {
        item_id: product_id.to_string(),
        direction: StockDirection::of_delta(delta),
        quantity: delta.abs(),
        mode: MovementMode::Forward,
        reason: LedgerReason::Adjustment,
        detail: note.trim().to_string(),
    };

    let outcome = stock::apply_movement(conn, &movement).await?;
    let (stock_before, stock_after) = match outcome {
        StockOutcome::Applied(change) => (change.before, change.after),
        StockOutcome::Unchanged { stock } => (stock, stock),
        StockOutcome::Service => return Err(CoreError::NotStockTracked(product_id.to_string()).into()),
    };

    let reference_id = Uuid::new_v4().to_string();
    let entry = LedgerWriter::new(ReferenceType::Adjustment, &reference_id, actor)
        .record(conn, &movement, &outcome)
        .await;

    Ok(StockAdjustment {
        reference_id,
        product_id: product_id.to_string(),
        stock_before,
        stock_after,
        entry,
    })
}
