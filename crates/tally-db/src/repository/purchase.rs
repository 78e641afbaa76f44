//! # Purchase Repository
//!
//! Database operations for supplier purchases and their items. Versioning
//! works exactly like sales.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::document_number;
use crate::repository::items::{self, LineTable};
use tally_core::{Actor, LineItemInput, Purchase, PurchasePayload, TransactionItem};

const PURCHASE_COLUMNS: &str = "id, tenant_id, reference_number, supplier_name, delivery_status, payment_status, \
     payment_method, total_cents, paid_cents, user_id, device_id, notes, created_at, updated_at, version";

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("SELECT {} FROM purchases WHERE id = ?1", PURCHASE_COLUMNS);
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(purchase)
    }

    /// Inserts a new purchase header.
    pub async fn insert_with(
        conn: &mut SqliteConnection,
        payload: &PurchasePayload,
        actor: &Actor,
    ) -> DbResult<Purchase> {
        let now = Utc::now();
        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            tenant_id: actor.tenant_id.clone(),
            reference_number: payload
                .reference_number
                .clone()
                .unwrap_or_else(|| document_number("PO", &actor.device_id)),
            supplier_name: payload.supplier_name.clone(),
            delivery_status: payload.delivery_status.trim().to_string(),
            payment_status: payload.payment_status.trim().to_string(),
            payment_method: payload.payment_method.clone(),
            total_cents: payload.total_cents,
            paid_cents: payload.paid_cents,
            user_id: actor.user_id.clone(),
            device_id: actor.device_id.clone(),
            notes: payload.notes.clone(),
            created_at: now,
            updated_at: now,
            version: 1,
        };

        debug!(id = %purchase.id, reference_number = %purchase.reference_number, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, tenant_id, reference_number, supplier_name,
                delivery_status, payment_status, payment_method,
                total_cents, paid_cents, user_id, device_id, notes,
                created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.tenant_id)
        .bind(&purchase.reference_number)
        .bind(&purchase.supplier_name)
        .bind(&purchase.delivery_status)
        .bind(&purchase.payment_status)
        .bind(&purchase.payment_method)
        .bind(purchase.total_cents)
        .bind(purchase.paid_cents)
        .bind(&purchase.user_id)
        .bind(&purchase.device_id)
        .bind(&purchase.notes)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .bind(purchase.version)
        .execute(&mut *conn)
        .await?;

        Ok(purchase)
    }

    /// Overwrites the header of `current` with the payload.
    ///
    /// ## Returns
    /// * `Err(DbError::Conflict)` - Version moved since `current` was read
    pub async fn update_with(
        conn: &mut SqliteConnection,
        current: &Purchase,
        payload: &PurchasePayload,
    ) -> DbResult<Purchase> {
        let reference_number = payload
            .reference_number
            .clone()
            .unwrap_or_else(|| current.reference_number.clone());

        debug!(id = %current.id, version = current.version, "Updating purchase");

        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                reference_number = ?3,
                supplier_name = ?4,
                delivery_status = ?5,
                payment_status = ?6,
                payment_method = ?7,
                total_cents = ?8,
                paid_cents = ?9,
                notes = ?10,
                updated_at = ?11,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&current.id)
        .bind(current.version)
        .bind(&reference_number)
        .bind(&payload.supplier_name)
        .bind(payload.delivery_status.trim())
        .bind(payload.payment_status.trim())
        .bind(&payload.payment_method)
        .bind(payload.total_cents)
        .bind(payload.paid_cents)
        .bind(&payload.notes)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Purchase", &current.id, current.version));
        }

        Self::find(conn, &current.id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", &current.id))
    }

    /// Deletes a purchase at the given version. Items cascade.
    pub async fn delete_with(conn: &mut SqliteConnection, id: &str, version: i64) -> DbResult<()> {
        debug!(id = %id, version, "Deleting purchase");

        let result = sqlx::query("DELETE FROM purchases WHERE id = ?1 AND version = ?2")
            .bind(id)
            .bind(version)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Purchase", id, version));
        }

        Ok(())
    }

    pub async fn items(conn: &mut SqliteConnection, purchase_id: &str) -> DbResult<Vec<TransactionItem>> {
        items::list(conn, LineTable::Purchase, purchase_id).await
    }

    pub async fn replace_items(
        conn: &mut SqliteConnection,
        purchase_id: &str,
        items: &[LineItemInput],
    ) -> DbResult<Vec<TransactionItem>> {
        items::replace(conn, LineTable::Purchase, purchase_id, items).await
    }

    /// Gets a purchase by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a purchase together with its items.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<(Purchase, Vec<TransactionItem>)>> {
        let mut conn = self.pool.acquire().await?;
        let Some(purchase) = Self::find(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = Self::items(&mut conn, id).await?;
        Ok(Some((purchase, items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_purchase_roundtrip_and_versioning() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let actor = Actor::new("buyer", "office-1");

        let payload = PurchasePayload::new("ordered", "pending", vec![LineItemInput::new("p", 12, 80)])
            .with_supplier("Metro Wholesale");
        let purchase = PurchaseRepository::insert_with(&mut conn, &payload, &actor).await.unwrap();
        assert!(purchase.reference_number.starts_with("PO-"));
        assert_eq!(purchase.total_cents, 960);

        let delivered = payload.clone().with_delivery_status("delivered");
        let updated = PurchaseRepository::update_with(&mut conn, &purchase, &delivered)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.delivery_status, "delivered");
        assert_eq!(updated.supplier_name.as_deref(), Some("Metro Wholesale"));

        let stale = PurchaseRepository::update_with(&mut conn, &purchase, &delivered).await;
        assert!(matches!(stale, Err(DbError::Conflict { .. })));

        PurchaseRepository::replace_items(&mut conn, &purchase.id, &payload.items)
            .await
            .unwrap();
        drop(conn);

        let (stored, items) = db.purchases().get_with_items(&purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 12);
    }
}
