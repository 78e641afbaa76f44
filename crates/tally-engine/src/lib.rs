//! # tally-engine: Reconciliation Engine
//!
//! Keeps product stock, the stock ledger and the financial outbox consistent
//! with every sale and purchase as they are created, edited and deleted.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Back-office request handlers                                          │
//! │       │  create_sale / update_purchase / adjust_stock / ...            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  InventoryEngine ──► sale / purchase / adjustment handlers      │   │
//! │  │        │                     │                                  │   │
//! │  │        │              stock ─┼─ ledger ─┬─ finance              │   │
//! │  │        ▼                     ▼          ▼                       │   │
//! │  │  config, telemetry    tally-core (plans)   tally-db (storage)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineResult<T>  or  ActionResult<T> (serializable)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tally_engine::{telemetry, EngineConfig, InventoryEngine};
//!
//! telemetry::init_tracing();
//! let config = EngineConfig::load_or_default(None)?;
//! let engine = InventoryEngine::open(&config).await?;
//!
//! let outcome = engine.create_sale(&payload, &config.actor("user-1")).await?;
//! ```

pub mod adjustment;
pub mod config;
pub mod engine;
pub mod error;
pub mod finance;
pub mod ledger;
pub mod purchase;
pub mod response;
pub mod sale;
pub mod stock;
pub mod telemetry;

pub use adjustment::StockAdjustment;
pub use config::{ConfigError, EngineConfig};
pub use engine::{InventoryEngine, TransactionOutcome};
pub use error::{EngineError, EngineResult};
pub use finance::{FinancialRecorder, OutboxRecorder};
pub use response::{ActionResult, ApiError, ErrorCode};
pub use stock::StockOutcome;
