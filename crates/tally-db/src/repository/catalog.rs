//! # Catalog Repository
//!
//! Services, and classification of the catalog ids referenced by line items.
//!
//! ```text
//! item_id ──► products? ──yes──► CatalogRef { Product, cost_cents }
//!                 │
//!                 no
//!                 ▼
//!             services? ──yes──► CatalogRef { Service, 0 }
//!                 │
//!                 no ──► None  (caller rejects the whole operation)
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CatalogRef, ItemKind, Service};

/// Repository for services and catalog lookups.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Classifies a catalog id as product or service.
    pub async fn classify(conn: &mut SqliteConnection, item_id: &str) -> DbResult<Option<CatalogRef>> {
        let cost: Option<i64> = sqlx::query_scalar("SELECT cost_cents FROM products WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(cost_cents) = cost {
            return Ok(Some(CatalogRef {
                kind: ItemKind::Product,
                cost_cents,
            }));
        }

        let service: Option<String> = sqlx::query_scalar("SELECT id FROM services WHERE id = ?1")
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(service.map(|_| CatalogRef {
            kind: ItemKind::Service,
            cost_cents: 0,
        }))
    }

    pub async fn insert_service_with(conn: &mut SqliteConnection, service: &Service) -> DbResult<()> {
        debug!(name = %service.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (id, tenant_id, name, price_cents, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&service.id)
        .bind(&service.tenant_id)
        .bind(&service.name)
        .bind(service.price_cents)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts a new service.
    pub async fn insert_service(&self, service: &Service) -> DbResult<Service> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_service_with(&mut conn, service).await?;
        Ok(service.clone())
    }

    /// Gets a service by its ID.
    pub async fn get_service(&self, id: &str) -> DbResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, tenant_id, name, price_cents, is_active, created_at, updated_at
            FROM services
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    /// Pooled variant of [`CatalogRepository::classify`].
    pub async fn lookup(&self, item_id: &str) -> DbResult<Option<CatalogRef>> {
        let mut conn = self.pool.acquire().await?;
        Self::classify(&mut conn, item_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::Product;

    #[tokio::test]
    async fn test_classify_products_and_services() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&Product::new("RICE-5KG", "Rice 5kg", 1200, 800, 4))
            .await
            .unwrap();
        let service = db
            .catalog()
            .insert_service(&Service::new("Home delivery", 300))
            .await
            .unwrap();

        let catalog = db.catalog();
        assert_eq!(
            catalog.lookup(&product.id).await.unwrap(),
            Some(CatalogRef {
                kind: ItemKind::Product,
                cost_cents: 800
            })
        );
        assert_eq!(catalog.lookup(&service.id).await.unwrap().map(|r| r.kind), Some(ItemKind::Service));
        assert_eq!(catalog.lookup("nope").await.unwrap(), None);

        let loaded = catalog.get_service(&service.id).await.unwrap().unwrap();
        assert_eq!(loaded.price_cents, 300);
    }
}
