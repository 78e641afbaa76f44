//! # Stock Ledger Repository
//!
//! Append and query the stock ledger. There is deliberately no update or
//! delete here, and the schema rejects both with triggers.
//!
//! ## Read Paths
//! ```text
//! for_product(product, limit)       newest first   (product history screen)
//! for_reference(type, id)           oldest first   (what did this sale do?)
//! between(from, to)                 oldest first   (audit export)
//! net_change(product)               Σ sign × qty   (completeness check)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{LedgerEntry, ReferenceType};

const LEDGER_COLUMNS: &str = "id, tenant_id, product_id, quantity, direction, reason, reference_type, reference_id, \
     note, user_id, device_id, stock_after, created_at";

/// Repository for the append-only stock ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends one entry on the given connection.
    pub async fn append(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
        debug!(
            product_id = %entry.product_id,
            reason = %entry.reason,
            direction = entry.direction.as_str(),
            quantity = entry.quantity,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_ledger (
                id, tenant_id, product_id, quantity, direction, reason,
                reference_type, reference_id, note, user_id, device_id,
                stock_after, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(&entry.product_id)
        .bind(entry.quantity)
        .bind(entry.direction)
        .bind(entry.reason)
        .bind(entry.reference_type)
        .bind(&entry.reference_id)
        .bind(&entry.note)
        .bind(&entry.user_id)
        .bind(&entry.device_id)
        .bind(entry.stock_after)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Entries for one product, newest first.
    pub async fn for_product(&self, product_id: &str, limit: u32) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM stock_ledger WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            LEDGER_COLUMNS
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Entries written for one transaction or adjustment, in write order.
    pub async fn for_reference(&self, reference_type: ReferenceType, reference_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM stock_ledger WHERE reference_type = ?1 AND reference_id = ?2 ORDER BY rowid ASC",
            LEDGER_COLUMNS
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(reference_type)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Entries created in `[from, to)`, in write order.
    pub async fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM stock_ledger WHERE created_at >= ?1 AND created_at < ?2 ORDER BY rowid ASC",
            LEDGER_COLUMNS
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Signed sum of all entries for a product.
    pub async fn net_change(&self, product_id: &str) -> DbResult<i64> {
        let net: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(
                CASE direction
                    WHEN 'in' THEN quantity
                    WHEN 'out' THEN -quantity
                    ELSE 0
                END
            ), 0)
            FROM stock_ledger
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net)
    }

    /// Total number of entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_ledger")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use tally_core::{LedgerReason, Product, StockDirection};

    fn entry(product_id: &str, direction: StockDirection, quantity: i64, reason: LedgerReason) -> LedgerEntry {
        LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tally_core::DEFAULT_TENANT_ID.to_string(),
            product_id: product_id.to_string(),
            quantity,
            direction,
            reason,
            reference_type: ReferenceType::Sale,
            reference_id: "sale-1".to_string(),
            note: Some("test".to_string()),
            user_id: "u".to_string(),
            device_id: "d".to_string(),
            stock_after: None,
            created_at: Utc::now(),
        }
    }

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&Product::new("SKU-1", "Thing", 100, 60, 10))
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let (db, product_id) = setup().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            for e in [
                entry(&product_id, StockDirection::Out, 3, LedgerReason::SaleCompleted),
                entry(&product_id, StockDirection::In, 3, LedgerReason::SaleReturned),
                entry(&product_id, StockDirection::Unchanged, 0, LedgerReason::SaleStatusChanged),
            ] {
                LedgerRepository::append(&mut conn, &e).await.unwrap();
            }
        }

        let ledger = db.ledger();
        let by_ref = ledger.for_reference(ReferenceType::Sale, "sale-1").await.unwrap();
        let reasons: Vec<_> = by_ref.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                LedgerReason::SaleCompleted,
                LedgerReason::SaleReturned,
                LedgerReason::SaleStatusChanged
            ]
        );
        assert_eq!(by_ref[2].direction, StockDirection::Unchanged);

        let newest = ledger.for_product(&product_id, 1).await.unwrap();
        assert_eq!(newest[0].reason, LedgerReason::SaleStatusChanged);

        assert_eq!(ledger.net_change(&product_id).await.unwrap(), 0);
        assert_eq!(ledger.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ledger_is_append_only() {
        let (db, product_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        LedgerRepository::append(
            &mut conn,
            &entry(&product_id, StockDirection::Out, 1, LedgerReason::SaleCompleted),
        )
        .await
        .unwrap();

        let update = sqlx::query("UPDATE stock_ledger SET quantity = 99")
            .execute(&mut *conn)
            .await
            .map_err(DbError::from);
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM stock_ledger")
            .execute(&mut *conn)
            .await
            .map_err(DbError::from);
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_time_range_query() {
        let (db, product_id) = setup().await;
        let before = Utc::now() - chrono::Duration::seconds(1);
        {
            let mut conn = db.pool().acquire().await.unwrap();
            LedgerRepository::append(
                &mut conn,
                &entry(&product_id, StockDirection::Out, 2, LedgerReason::SaleCompleted),
            )
            .await
            .unwrap();
        }
        let after = Utc::now() + chrono::Duration::seconds(1);

        assert_eq!(db.ledger().between(before, after).await.unwrap().len(), 1);
        assert!(db.ledger().between(after, after + chrono::Duration::hours(1)).await.unwrap().is_empty());
    }
}
