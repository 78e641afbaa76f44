//! # Product Repository
//!
//! Database operations for stock-tracked products.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: Absolute update (lost updates between terminals)        │
//! │     UPDATE products SET stock = 7 WHERE id = ?                     │
//! │                                                                     │
//! │  ✅ CORRECT: Delta update                                          │
//! │     UPDATE products SET stock = stock - 3 WHERE id = ?             │
//! │                                                                     │
//! │  Restores (stock coming back from a sale) are floored at zero:     │
//! │     UPDATE products SET stock = MAX(0, stock + 3) WHERE id = ?     │
//! │                                                                     │
//! │  Exactly one UPDATE per movement; RETURNING gives stock after.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking a `&mut SqliteConnection` run inside the caller's atomic
//! scope; methods on `&self` acquire their own pooled connection.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::Product;

const PRODUCT_COLUMNS: &str =
    "id, tenant_id, sku, name, price_cents, cost_cents, stock, is_active, created_at, updated_at, sync_version";

/// Stock level of one product before and after a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub before: i64,
    pub after: i64,
}

impl StockChange {
    /// The change actually applied (after any clamping).
    #[inline]
    pub fn applied_delta(&self) -> i64 {
        self.after - self.before
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("uuid-here").await?;
///
/// // Inside an atomic scope
/// let change = ProductRepository::apply_stock_delta(&mut tx, &id, -3, false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Scoped operations
    // =========================================================================

    /// Loads a product on the given connection.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Inserts a product on the given connection.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists for the tenant
    pub async fn insert_with(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, price_cents, cost_cents,
                stock, is_active, created_at, updated_at, sync_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.sync_version)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Applies a signed delta to a product's stock.
    ///
    /// ## Arguments
    /// * `delta` - Negative takes stock out, positive brings it in
    /// * `floor_zero` - Clamp the result at zero (restoring stock)
    ///
    /// The clamp applies to the result, not the delta: restoring 3 onto a
    /// stock of -13 lands on 0, so the applied change is +13. Callers record
    /// `StockChange::applied_delta`, which can exceed the reversed quantity.
    ///
    /// ## Returns
    /// * `Ok(Some(StockChange))` - Product updated
    /// * `Ok(None)` - No product with this id
    pub async fn apply_stock_delta(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        floor_zero: bool,
    ) -> DbResult<Option<StockChange>> {
        let before: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(before) = before else {
            return Ok(None);
        };

        let sql = if floor_zero {
            r#"
            UPDATE products
            SET stock = MAX(0, stock + ?2), updated_at = ?3, sync_version = sync_version + 1
            WHERE id = ?1
            RETURNING stock
            "#
        } else {
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3, sync_version = sync_version + 1
            WHERE id = ?1
            RETURNING stock
            "#
        };

        let after: i64 = sqlx::query_scalar(sql)
            .bind(id)
            .bind(delta)
            .bind(Utc::now())
            .fetch_one(&mut *conn)
            .await?;

        debug!(id = %id, delta, before, after, "Stock updated");
        Ok(Some(StockChange { before, after }))
    }

    /// Current stock of a product.
    pub async fn stock_of(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<i64>> {
        let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(stock)
    }

    // =========================================================================
    // Pooled convenience
    // =========================================================================

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a product by tenant and SKU.
    pub async fn get_by_sku(&self, tenant_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND sku = ?2",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, product).await?;
        Ok(product.clone())
    }

    /// Current stock, failing if the product doesn't exist.
    pub async fn stock(&self, id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::stock_of(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
