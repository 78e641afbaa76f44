//! # Inventory Engine
//!
//! The in-process entry point. Owns the database handle, the transactional
//! executor, the status policy and the financial recorder.
//!
//! ## One Mutation, One Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update_sale(id, payload, expected_version, actor)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate payload ──► reject, nothing touched                          │
//! │       │                                                                 │
//! │       ▼  executor.run("update_sale", ..)  (BEGIN)                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ 1. read old header + items          (old snapshot)              │  │
//! │  │ 2. check version                    → Conflict                  │  │
//! │  │ 3. classify every line              → UnknownItem               │  │
//! │  │ 4. write header (version + 1) and items                         │  │
//! │  │ 5. Reconciler::update(old, new)     → movements                 │  │
//! │  │ 6. per movement: stock UPDATE, ledger append (log on failure)   │  │
//! │  │ 7. financial adjustment             (log on failure)            │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │       │  COMMIT, or ROLLBACK + retry the whole block when transient    │
//! │       ▼                                                                 │
//! │  TransactionOutcome { record, items, ledger, financial_recorded }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The handlers themselves live in [`crate::sale`], [`crate::purchase`] and
//! [`crate::adjustment`]; this module holds construction, shared steps and
//! read access.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tally_core::{
    CoreError, LedgerEntry, LineItemInput, Purchase, ReferenceType, Sale, StatusPolicy, StockMovement,
    TransactionItem,
};
use tally_db::{CatalogRepository, Database, FinancialOutboxRepository, RetryPolicy, TransactionalExecutor};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::finance::{FinancialRecorder, OutboxRecorder};
use crate::ledger::LedgerWriter;
use crate::stock;

// =============================================================================
// Outcome
// =============================================================================

/// Result of a sale or purchase mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome<T> {
    /// Stored header; for deletes, the header as it was before removal.
    pub record: T,
    pub items: Vec<TransactionItem>,
    /// Ledger rows appended by this mutation.
    pub ledger: Vec<LedgerEntry>,
    pub financial_recorded: bool,
}

// =============================================================================
// Engine
// =============================================================================

/// Stock-and-accounting reconciliation engine.
///
/// ## Usage
/// ```rust,ignore
/// let engine = InventoryEngine::open(&EngineConfig::load_or_default(None)?).await?;
/// let actor = Actor::new("user-1", "till-1");
///
/// let created = engine.create_sale(&payload, &actor).await?;
/// let updated = engine
///     .update_sale(&created.record.id, &edited, Some(created.record.version), &actor)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryEngine<R = OutboxRecorder> {
    pub(crate) db: Database,
    pub(crate) executor: TransactionalExecutor,
    pub(crate) policy: StatusPolicy,
    pub(crate) recorder: R,
}

impl InventoryEngine<OutboxRecorder> {
    /// Engine with default retry and status policies, recording to the outbox.
    pub fn new(db: Database) -> Self {
        InventoryEngine {
            executor: db.executor(RetryPolicy::default()),
            db,
            policy: StatusPolicy::default(),
            recorder: OutboxRecorder,
        }
    }

    /// Connects to the configured database and applies every setting.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let db = Database::new(config.db_config()).await?;

        info!(
            path = %config.database.path.display(),
            max_retries = config.retry.max_retries,
            unknown_status = %config.policy.unknown_status,
            "Inventory engine ready"
        );

        Ok(Self::new(db)
            .with_retry_policy(config.retry_policy())
            .with_status_policy(config.status_policy()))
    }
}

impl<R: FinancialRecorder> InventoryEngine<R> {
    /// Swaps the financial recorder.
    pub fn with_recorder<R2: FinancialRecorder>(self, recorder: R2) -> InventoryEngine<R2> {
        InventoryEngine {
            db: self.db,
            executor: self.executor,
            policy: self.policy,
            recorder,
        }
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.executor = self.db.executor(policy);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.policy
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Ledger rows for a product, newest first.
    pub async fn product_history(&self, product_id: &str, limit: u32) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.db.ledger().for_product(product_id, limit).await?)
    }

    /// Ledger rows written for one sale, purchase or adjustment, in order.
    pub async fn ledger_for(&self, reference_type: ReferenceType, reference_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.db.ledger().for_reference(reference_type, reference_id).await?)
    }

    /// Ledger rows created in `[from, to)`.
    pub async fn ledger_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EngineResult<Vec<LedgerEntry>> {
        Ok(self.db.ledger().between(from, to).await?)
    }

    /// Signed sum of every ledger row for a product.
    ///
    /// Equals current stock minus the stock the product started with.
    pub async fn ledger_net_change(&self, product_id: &str) -> EngineResult<i64> {
        Ok(self.db.ledger().net_change(product_id).await?)
    }

    /// Current stock of a product.
    pub async fn stock_level(&self, product_id: &str) -> EngineResult<i64> {
        Ok(self.db.products().stock(product_id).await?)
    }

    pub async fn sale(&self, id: &str) -> EngineResult<Option<(Sale, Vec<TransactionItem>)>> {
        Ok(self.db.sales().get_with_items(id).await?)
    }

    pub async fn purchase(&self, id: &str) -> EngineResult<Option<(Purchase, Vec<TransactionItem>)>> {
        Ok(self.db.purchases().get_with_items(id).await?)
    }

    /// Outbox of financial adjustments awaiting the accounting processor.
    pub fn financial_outbox(&self) -> FinancialOutboxRepository {
        self.db.financial_outbox()
    }
}

// =============================================================================
// Shared steps
// =============================================================================

/// Classifies every line and fills missing cost snapshots.
///
/// A line keeping the id of a stored line keeps that line's snapshot;
/// new lines take the catalog cost when `snapshot_cost` is set.
pub(crate) async fn resolve_lines(
    conn: &mut SqliteConnection,
    lines: &[LineItemInput],
    previous: &[TransactionItem],
    snapshot_cost: bool,
) -> EngineResult<Vec<LineItemInput>> {
    let mut resolved = Vec::with_capacity(lines.len());

    for line in lines {
        let catalog = CatalogRepository::classify(conn, &line.item_id)
            .await?
            .ok_or_else(|| CoreError::UnknownItem(line.item_id.clone()))?;

        let mut line = line.clone();
        if line.unit_cost_cents.is_none() {
            let kept = line
                .id
                .as_deref()
                .and_then(|id| previous.iter().find(|old| old.id == id && old.item_id == line.item_id))
                .and_then(|old| old.unit_cost_cents);

            line.unit_cost_cents = kept.or(snapshot_cost.then_some(catalog.cost_cents));
        }
        resolved.push(line);
    }

    Ok(resolved)
}

/// Applies each movement and appends its ledger row.
///
/// Stock failures abort the scope; ledger failures do not.
pub(crate) async fn apply_plan(
    conn: &mut SqliteConnection,
    plan: &[StockMovement],
    writer: &LedgerWriter<'_>,
) -> EngineResult<Vec<LedgerEntry>> {
    let mut entries = Vec::with_capacity(plan.len());

    for movement in plan {
        let outcome = stock::apply_movement(conn, movement).await?;
        if let Some(entry) = writer.record(conn, movement, &outcome).await {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Fails when the caller saw an older version than the one stored.
pub(crate) fn check_version(entity: &str, id: &str, stored: i64, expected: Option<i64>) -> EngineResult<()> {
    match expected {
        Some(expected) if expected != stored => Err(EngineError::conflict(entity, id, expected)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Product, Service};
    use tally_db::DbConfig;

    #[test]
    fn test_check_version() {
        assert!(check_version("Sale", "s-1", 3, None).is_ok());
        assert!(check_version("Sale", "s-1", 3, Some(3)).is_ok());
        assert!(matches!(
            check_version("Sale", "s-1", 3, Some(2)),
            Err(EngineError::Conflict { expected_version: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_lines_snapshots_cost() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&Product::new("TEA-1", "Tea", 300, 210, 10)).await.unwrap();
        let service = db.catalog().insert_service(&Service::new("Gift Wrap", 150)).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let lines = vec![
            LineItemInput::new(&product.id, 2, 300),
            LineItemInput::new(&service.id, 1, 150),
            LineItemInput::new(&product.id, 1, 300).with_unit_cost(99),
        ];
        let resolved = resolve_lines(&mut conn, &lines, &[], true).await.unwrap();

        assert_eq!(resolved[0].unit_cost_cents, Some(210));
        assert_eq!(resolved[1].unit_cost_cents, Some(0));
        assert_eq!(resolved[2].unit_cost_cents, Some(99));

        let without = resolve_lines(&mut conn, &lines[..1], &[], false).await.unwrap();
        assert_eq!(without[0].unit_cost_cents, None);
    }

    #[tokio::test]
    async fn test_resolve_lines_rejects_unknown_ids() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = resolve_lines(&mut conn, &[LineItemInput::new("ghost", 1, 100)], &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::UnknownItem(id)) if id == "ghost"));
    }
}
