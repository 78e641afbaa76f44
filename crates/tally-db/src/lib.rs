//! # tally-db: Database Layer for Tally
//!
//! SQLite storage for the inventory engine, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  InventoryEngine (tally-engine)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_init.sql │  │   │
//! │  │   │               │    │ PurchaseRepo  │    │              │  │   │
//! │  │   └───────┬───────┘    │ LedgerRepo    │    └──────────────┘  │   │
//! │  │           │            │ OutboxRepo    │                      │   │
//! │  │           ▼            └───────────────┘                      │   │
//! │  │   ┌──────────────────────┐                                    │   │
//! │  │   │ TransactionalExecutor│  BEGIN / COMMIT / ROLLBACK + retry │   │
//! │  │   └──────────────────────┘                                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`executor`] - Atomic scopes with bounded retry
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//! let history = db.ledger().for_product(&product_id, 50).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod executor;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use executor::{RetryPolicy, TransactionalExecutor, TransientError, Tx};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::financial::FinancialOutboxRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::product::{ProductRepository, StockChange};
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
