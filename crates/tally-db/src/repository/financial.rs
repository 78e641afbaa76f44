//! # Financial Outbox Repository
//!
//! Durable queue of financial adjustments for accounting.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  update_sale(...)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE sales / sale_items                                   │   │
//! │  │  2. UPDATE products SET stock = stock ± n                       │   │
//! │  │  3. INSERT INTO stock_ledger ...                                │   │
//! │  │  4. INSERT INTO financial_outbox (transaction_id, payload)      │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← all succeed or none do                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ACCOUNTING WORKER (out of band)                                       │
//! │  1. pending(limit)                                                     │
//! │  2. post each adjustment                                               │
//! │     a. On success: mark_processed(id)                                  │
//! │     b. On failure: mark_failed(id, error)                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{FinancialAdjustment, FinancialOutboxEntry};

const OUTBOX_COLUMNS: &str = "id, tenant_id, transaction_type, transaction_id, event, payload, attempts, \
     last_error, created_at, attempted_at, processed_at";

/// Repository for financial outbox operations.
#[derive(Debug, Clone)]
pub struct FinancialOutboxRepository {
    pool: SqlitePool,
}

impl FinancialOutboxRepository {
    /// Creates a new FinancialOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FinancialOutboxRepository { pool }
    }

    /// Queues an adjustment inside the caller's atomic scope.
    pub async fn enqueue(conn: &mut SqliteConnection, adjustment: &FinancialAdjustment) -> DbResult<FinancialOutboxEntry> {
        let entry = FinancialOutboxEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: adjustment.tenant_id.clone(),
            transaction_type: adjustment.transaction_type,
            transaction_id: adjustment.transaction_id.clone(),
            event: adjustment.event.as_str().to_string(),
            payload: adjustment.to_json()?,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            processed_at: None,
        };

        debug!(
            transaction_type = %entry.transaction_type,
            transaction_id = %entry.transaction_id,
            event = %entry.event,
            "Queuing financial adjustment"
        );

        sqlx::query(
            r#"
            INSERT INTO financial_outbox (
                id, tenant_id, transaction_type, transaction_id, event, payload,
                attempts, last_error, created_at, attempted_at, processed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(entry.transaction_type)
        .bind(&entry.transaction_id)
        .bind(&entry.event)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.processed_at)
        .execute(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// Gets entries not yet processed, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<FinancialOutboxEntry>> {
        let sql = format!(
            "SELECT {} FROM financial_outbox WHERE processed_at IS NULL ORDER BY created_at ASC, rowid ASC LIMIT ?1",
            OUTBOX_COLUMNS
        );
        let entries = sqlx::query_as::<_, FinancialOutboxEntry>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// All entries for one transaction, in write order.
    pub async fn for_transaction(&self, transaction_id: &str) -> DbResult<Vec<FinancialOutboxEntry>> {
        let sql = format!(
            "SELECT {} FROM financial_outbox WHERE transaction_id = ?1 ORDER BY rowid ASC",
            OUTBOX_COLUMNS
        );
        let entries = sqlx::query_as::<_, FinancialOutboxEntry>(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Marks an entry as handed to accounting.
    pub async fn mark_processed(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE financial_outbox SET
                processed_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a processing failure.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE financial_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts unprocessed entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM financial_outbox WHERE processed_at IS NULL")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes processed entries older than `days_old` days.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_processed(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));

        let result = sqlx::query(
            r#"
            DELETE FROM financial_outbox
            WHERE processed_at IS NOT NULL
            AND processed_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{Actor, FinancialEvent, TransactionKind};

    fn adjustment(id: &str) -> FinancialAdjustment {
        let actor = Actor::new("u", "d");
        FinancialAdjustment {
            transaction_id: id.to_string(),
            transaction_type: TransactionKind::Sale,
            event: FinancialEvent::Created,
            status: "completed".to_string(),
            payment_method: "cash".to_string(),
            total_cents: 1000,
            cogs_cents: 600,
            received_cents: 1000,
            outstanding_cents: 0,
            tenant_id: actor.tenant_id,
            user_id: actor.user_id,
            device_id: actor.device_id,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_outbox_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        {
            let mut conn = db.pool().acquire().await.unwrap();
            FinancialOutboxRepository::enqueue(&mut conn, &adjustment("s1")).await.unwrap();
            FinancialOutboxRepository::enqueue(&mut conn, &adjustment("s2")).await.unwrap();
        }

        let outbox = db.financial_outbox();
        assert_eq!(outbox.count_pending().await.unwrap(), 2);

        let pending = outbox.pending(10).await.unwrap();
        assert_eq!(pending[0].transaction_id, "s1");
        let payload: FinancialAdjustment = serde_json::from_str(&pending[0].payload).unwrap();
        assert_eq!(payload.cogs_cents, 600);

        outbox.mark_failed(&pending[0].id, "ledger offline").await.unwrap();
        outbox.mark_processed(&pending[1].id).await.unwrap();

        let still_pending = outbox.pending(10).await.unwrap();
        assert_eq!(still_pending.len(), 1);
        assert_eq!(still_pending[0].attempts, 1);
        assert_eq!(still_pending[0].last_error.as_deref(), Some("ledger offline"));

        // Processed moments ago: not old enough to clean up
        assert_eq!(outbox.cleanup_processed(1).await.unwrap(), 0);
        assert_eq!(outbox.for_transaction("s2").await.unwrap().len(), 1);
    }
}
