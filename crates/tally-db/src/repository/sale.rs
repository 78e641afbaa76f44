//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Optimistic Versioning
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Writer A reads sale (version 3)      Writer B reads sale (version 3)  │
//! │       │                                    │                            │
//! │       ▼                                    │                            │
//! │  UPDATE ... WHERE id = ? AND version = 3   │                            │
//! │  → 1 row, version becomes 4                │                            │
//! │                                            ▼                            │
//! │                         UPDATE ... WHERE id = ? AND version = 3         │
//! │                         → 0 rows → DbError::Conflict                    │
//! │                                                                         │
//! │  B's stock deltas never run: its whole atomic scope rolls back.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::document_number;
use crate::repository::items::{self, LineTable};
use tally_core::{Actor, Sale, SalePayload, TransactionItem};

const SALE_COLUMNS: &str = "id, tenant_id, invoice_number, status, payment_method, total_cents, received_cents, \
     customer_name, user_id, device_id, notes, created_at, updated_at, version";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Scoped operations
    // =========================================================================

    /// Loads a sale on the given connection.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }

    /// Inserts a new sale header (items are written separately).
    ///
    /// ## Returns
    /// The stored sale with generated id, invoice number and version 1.
    pub async fn insert_with(conn: &mut SqliteConnection, payload: &SalePayload, actor: &Actor) -> DbResult<Sale> {
        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            invoice_number: payload
                .invoice_number
                .clone()
                .unwrap_or_else(|| document_number("INV", &actor.device_id)),
            status: payload.status.trim().to_string(),
            payment_method: payload.payment_method.clone(),
            total_cents: payload.total_cents,
            received_cents: payload.received_cents,
            customer_name: payload.customer_name.clone(),
            user_id: actor.user_id.clone(),
            device_id: actor.device_id.clone(),
            notes: payload.notes.clone(),
            created_at: now,
            updated_at: now,
            version: 1,
        };

        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, invoice_number, status, payment_method,
                total_cents, received_cents, customer_name,
                user_id, device_id, notes, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.invoice_number)
        .bind(&sale.status)
        .bind(&sale.payment_method)
        .bind(sale.total_cents)
        .bind(sale.received_cents)
        .bind(&sale.customer_name)
        .bind(&sale.user_id)
        .bind(&sale.device_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.version)
        .execute(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Overwrites the header of `current` with the payload.
    ///
    /// ## Returns
    /// * `Ok(Sale)` - Updated sale, version incremented
    /// * `Err(DbError::Conflict)` - Version moved since `current` was read
    pub async fn update_with(conn: &mut SqliteConnection, current: &Sale, payload: &SalePayload) -> DbResult<Sale> {
        let now = Utc::now();
        let invoice_number = payload
            .invoice_number
            .clone()
            .unwrap_or_else(|| current.invoice_number.clone());

        debug!(id = %current.id, version = current.version, "Updating sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                invoice_number = ?3,
                status = ?4,
                payment_method = ?5,
                total_cents = ?6,
                received_cents = ?7,
                customer_name = ?8,
                notes = ?9,
                updated_at = ?10,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&current.id)
        .bind(current.version)
        .bind(&invoice_number)
        .bind(payload.status.trim())
        .bind(&payload.payment_method)
        .bind(payload.total_cents)
        .bind(payload.received_cents)
        .bind(&payload.customer_name)
        .bind(&payload.notes)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Sale", &current.id, current.version));
        }

        Self::find(conn, &current.id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &current.id))
    }

    /// Deletes a sale at the given version. Items cascade.
    pub async fn delete_with(conn: &mut SqliteConnection, id: &str, version: i64) -> DbResult<()> {
        debug!(id = %id, version, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1 AND version = ?2")
            .bind(id)
            .bind(version)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Sale", id, version));
        }

        Ok(())
    }

    pub async fn items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<TransactionItem>> {
        items::list(conn, LineTable::Sale, sale_id).await
    }

    pub async fn replace_items(
        conn: &mut SqliteConnection,
        sale_id: &str,
        items: &[tally_core::LineItemInput],
    ) -> DbResult<Vec<TransactionItem>> {
        items::replace(conn, LineTable::Sale, sale_id, items).await
    }

    // =========================================================================
    // Pooled convenience
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a sale together with its items.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<(Sale, Vec<TransactionItem>)>> {
        let mut conn = self.pool.acquire().await?;
        let Some(sale) = Self::find(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = Self::items(&mut conn, id).await?;
        Ok(Some((sale, items)))
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
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
    use crate::pool::{Database, DbConfig};
    use tally_core::LineItemInput;

    fn payload(status: &str) -> SalePayload {
        SalePayload::new(status, "cash", vec![LineItemInput::new("p", 2, 250)])
    }

    #[tokio::test]
    async fn test_insert_generates_invoice_and_version() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let sale = SaleRepository::insert_with(&mut conn, &payload("completed"), &Actor::new("u1", "till-07"))
            .await
            .unwrap();
        assert!(sale.invoice_number.starts_with("INV-"));
        assert_eq!(sale.version, 1);
        assert_eq!(sale.total_cents, 500);

        drop(conn);
        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, "completed");
        assert_eq!(loaded.device_id, "till-07");
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_detects_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let actor = Actor::new("u1", "d1");

        let sale = SaleRepository::insert_with(&mut conn, &payload("pending"), &actor).await.unwrap();
        let updated = SaleRepository::update_with(&mut conn, &sale, &payload("completed"))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.status, "completed");

        // Stale snapshot
        let err = SaleRepository::update_with(&mut conn, &sale, &payload("cancelled"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { expected_version: 1, .. }));

        let err = SaleRepository::delete_with(&mut conn, &sale.id, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        SaleRepository::delete_with(&mut conn, &sale.id, 2).await.unwrap();
        assert!(SaleRepository::find(&mut conn, &sale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_items_cascade_on_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let p = payload("pending");

        let sale = SaleRepository::insert_with(&mut conn, &p, &Actor::new("u", "d")).await.unwrap();
        SaleRepository::replace_items(&mut conn, &sale.id, &p.items).await.unwrap();
        assert_eq!(SaleRepository::items(&mut conn, &sale.id).await.unwrap().len(), 1);

        SaleRepository::delete_with(&mut conn, &sale.id, sale.version).await.unwrap();
        assert!(SaleRepository::items(&mut conn, &sale.id).await.unwrap().is_empty());
    }
}
