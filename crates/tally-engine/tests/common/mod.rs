//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;
use tally_core::{Actor, Product, Service};
use tally_db::{Database, DbConfig, RetryPolicy};
use tally_engine::InventoryEngine;

pub fn actor() -> Actor {
    Actor::new("user-1", "till-1")
}

/// Fresh in-memory engine with millisecond retry delays.
pub async fn engine() -> InventoryEngine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    InventoryEngine::new(db).with_retry_policy(RetryPolicy::default().initial_backoff(Duration::from_millis(1)))
}

/// Engine on a fresh temporary database file, so several connections share it.
///
/// Waits at most `busy_timeout` for a lock before surfacing it as transient.
pub async fn file_engine(busy_timeout: Duration) -> (InventoryEngine, PathBuf) {
    let path = std::env::temp_dir().join(format!("tally-test-{}.db", uuid::Uuid::new_v4()));
    let config = DbConfig::new(path.clone()).max_connections(4).busy_timeout(busy_timeout);
    let db = Database::new(config).await.unwrap();

    let retry = RetryPolicy::default()
        .max_retries(6)
        .initial_backoff(Duration::from_millis(20));
    (InventoryEngine::new(db).with_retry_policy(retry), path)
}

/// Removes a database file created by [`file_engine`], with its WAL files.
pub fn remove_db(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub async fn product<R: tally_engine::FinancialRecorder>(
    engine: &InventoryEngine<R>,
    sku: &str,
    price_cents: i64,
    cost_cents: i64,
    stock: i64,
) -> Product {
    engine
        .database()
        .products()
        .insert(&Product::new(sku, format!("Product {}", sku), price_cents, cost_cents, stock))
        .await
        .unwrap()
}

pub async fn service<R: tally_engine::FinancialRecorder>(engine: &InventoryEngine<R>, name: &str, price_cents: i64) -> Service {
    engine
        .database()
        .catalog()
        .insert_service(&Service::new(name, price_cents))
        .await
        .unwrap()
}

pub async fn stock<R: tally_engine::FinancialRecorder>(engine: &InventoryEngine<R>, product: &Product) -> i64 {
    engine.stock_level(&product.id).await.unwrap()
}
