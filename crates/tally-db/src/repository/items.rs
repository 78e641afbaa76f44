//! # Line Item Storage
//!
//! Sale and purchase items share one shape and one write rule.
//!
//! ## Replace Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stored:  [L1 coke×2] [L2 rice×1] [L3 soap×4]                           │
//! │  payload: [L1 coke×5] [-  tea×1 ]                                       │
//! │                                                                         │
//! │  L1 carried in payload, belongs to this transaction  → UPDATE           │
//! │  tea has no known id                                 → INSERT (new id)  │
//! │  L2, L3 omitted from payload                         → DELETE           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! An id that belongs to a different transaction is treated as unknown.

use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{LineItemInput, TransactionItem};

/// Which item table to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTable {
    Sale,
    Purchase,
}

impl LineTable {
    fn table(&self) -> &'static str {
        match self {
            LineTable::Sale => "sale_items",
            LineTable::Purchase => "purchase_items",
        }
    }

    fn parent_column(&self) -> &'static str {
        match self {
            LineTable::Sale => "sale_id",
            LineTable::Purchase => "purchase_id",
        }
    }
}

/// Lists the items of one transaction in insertion order.
pub async fn list(conn: &mut SqliteConnection, table: LineTable, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
    let sql = format!(
        r#"
        SELECT id, {parent} AS transaction_id, item_id, quantity,
               unit_price_cents, unit_cost_cents, created_at
        FROM {table}
        WHERE {parent} = ?1
        ORDER BY rowid ASC
        "#,
        parent = table.parent_column(),
        table = table.table(),
    );

    let items = sqlx::query_as::<_, TransactionItem>(&sql)
        .bind(transaction_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Writes the payload items for a transaction, returning the stored items.
pub async fn replace(
    conn: &mut SqliteConnection,
    table: LineTable,
    transaction_id: &str,
    items: &[LineItemInput],
) -> DbResult<Vec<TransactionItem>> {
    let existing = list(conn, table, transaction_id).await?;
    let existing_ids: HashSet<&str> = existing.iter().map(|item| item.id.as_str()).collect();

    let mut kept: HashSet<String> = HashSet::new();
    let now = Utc::now();

    for item in items {
        let known_id = item
            .id
            .as_deref()
            .filter(|id| existing_ids.contains(id))
            .map(str::to_string);

        match known_id {
            Some(id) => {
                let sql = format!(
                    r#"
                    UPDATE {table}
                    SET item_id = ?2, quantity = ?3, unit_price_cents = ?4, unit_cost_cents = ?5
                    WHERE id = ?1
                    "#,
                    table = table.table(),
                );
                sqlx::query(&sql)
                    .bind(&id)
                    .bind(&item.item_id)
                    .bind(item.quantity)
                    .bind(item.unit_price_cents)
                    .bind(item.unit_cost_cents)
                    .execute(&mut *conn)
                    .await?;
                kept.insert(id);
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let sql = format!(
                    r#"
                    INSERT INTO {table} (
                        id, {parent}, item_id, quantity, unit_price_cents, unit_cost_cents, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    table = table.table(),
                    parent = table.parent_column(),
                );
                sqlx::query(&sql)
                    .bind(&id)
                    .bind(transaction_id)
                    .bind(&item.item_id)
                    .bind(item.quantity)
                    .bind(item.unit_price_cents)
                    .bind(item.unit_cost_cents)
                    .bind(now)
                    .execute(&mut *conn)
                    .await?;
                kept.insert(id);
            }
        }
    }

    let removed: Vec<&str> = existing_ids
        .iter()
        .copied()
        .filter(|id| !kept.contains(*id))
        .collect();

    for id in &removed {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table.table());
        sqlx::query(&sql).bind(*id).execute(&mut *conn).await?;
    }

    debug!(
        table = table.table(),
        transaction_id = %transaction_id,
        written = items.len(),
        removed = removed.len(),
        "Line items replaced"
    );

    list(conn, table, transaction_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{Actor, SalePayload};

    #[tokio::test]
    async fn test_replace_updates_inserts_and_deletes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let payload = SalePayload::new(
            "pending",
            "cash",
            vec![LineItemInput::new("a", 2, 100), LineItemInput::new("b", 1, 100)],
        );
        let sale = crate::repository::sale::SaleRepository::insert_with(
            &mut conn,
            &payload,
            &Actor::new("u", "d"),
        )
        .await
        .unwrap();

        let first = replace(&mut conn, LineTable::Sale, &sale.id, &payload.items).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|item| item.transaction_id == sale.id));

        let a_id = first[0].id.clone();
        let next = vec![
            LineItemInput::new("a", 5, 100).with_id(a_id.clone()),
            LineItemInput::new("c", 1, 100).with_id("foreign-line"),
        ];
        let second = replace(&mut conn, LineTable::Sale, &sale.id, &next).await.unwrap();

        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, a_id);
        assert_eq!(second[0].quantity, 5);
        assert_eq!(second[1].item_id, "c");
        assert_ne!(second[1].id, "foreign-line");
        assert!(second.iter().all(|item| item.item_id != "b"));
    }
}
