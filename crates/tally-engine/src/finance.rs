//! # Financial Recording
//!
//! Hands one [`FinancialAdjustment`] per mutation to accounting.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  atomic scope                                                          │
//! │    stock + ledger ──► FinancialRecorder::record(conn, adjustment)      │
//! │                              │                                          │
//! │                              ├── Ok  ──► outbox row commits with scope │
//! │                              └── Err ──► warn!, scope still commits    │
//! │                                                                         │
//! │  later, out of band                                                    │
//! │    FinancialOutboxRepository::pending → post → mark_processed         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use std::future::Future;
use tally_core::FinancialAdjustment;
use tally_db::{DbResult, FinancialOutboxRepository};
use tracing::{debug, warn};

/// Receives the financial side of a stock mutation.
///
/// Runs on the scope's connection, so a durable implementation commits or
/// rolls back together with the stock change.
pub trait FinancialRecorder: Send + Sync {
    fn record(
        &self,
        conn: &mut SqliteConnection,
        adjustment: &FinancialAdjustment,
    ) -> impl Future<Output = DbResult<()>> + Send;
}

/// Writes adjustments to the `financial_outbox` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutboxRecorder;

impl FinancialRecorder for OutboxRecorder {
    async fn record(&self, conn: &mut SqliteConnection, adjustment: &FinancialAdjustment) -> DbResult<()> {
        let entry = FinancialOutboxRepository::enqueue(conn, adjustment).await?;
        debug!(outbox_id = %entry.id, event = %adjustment.event, "Financial adjustment queued");
        Ok(())
    }
}

/// Records `adjustment`, logging instead of failing. Returns whether it stuck.
pub(crate) async fn record_or_warn<R: FinancialRecorder>(
    recorder: &R,
    conn: &mut SqliteConnection,
    adjustment: &FinancialAdjustment,
) -> bool {
    match recorder.record(conn, adjustment).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                transaction_id = %adjustment.transaction_id,
                transaction_type = %adjustment.transaction_type,
                event = %adjustment.event,
                error = %e,
                "Financial recording failed, continuing"
            );
            false
        }
    }
}
