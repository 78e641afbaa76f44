//! # Transactional Executor
//!
//! Runs a unit of work inside one SQLite transaction and retries the whole
//! unit when the failure is transient.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  run("update_sale", op)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ──► op(tx) ──► Ok  ──► COMMIT ──► done                          │
//! │                 │                                                       │
//! │                 └──► Err ──► ROLLBACK                                  │
//! │                                │                                        │
//! │                  transient? ───┼── no ──► surface error                │
//! │                                │                                        │
//! │                               yes, retries left                         │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                 sleep 100ms → 200ms → 400ms, then run op again         │
//! │                 (op re-reads everything: old snapshot included)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The operation receives the transaction by value and hands it back with
//! its result, so the executor alone decides between commit and rollback.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::DbError;

/// The transaction handed to a unit of work.
pub type Tx = Transaction<'static, Sqlite>;

/// Classifies errors the executor may retry.
pub trait TransientError {
    fn is_transient(&self) -> bool;
}

impl TransientError for DbError {
    fn is_transient(&self) -> bool {
        DbError::is_transient(self)
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential backoff.
///
/// ## Defaults
/// - 3 retries after the first attempt
/// - 100ms initial delay, doubling, capped at 2s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, never retried.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Creates the exponential backoff configuration (no jitter).
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// The delays slept between attempts, in order.
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.create_backoff();
        (0..self.max_retries)
            .map(|_| backoff.next_backoff().unwrap_or(self.max_backoff))
            .collect()
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Atomic scope with bounded retry.
#[derive(Debug, Clone)]
pub struct TransactionalExecutor {
    pool: SqlitePool,
    policy: RetryPolicy,
}

impl TransactionalExecutor {
    pub fn new(pool: SqlitePool, policy: RetryPolicy) -> Self {
        TransactionalExecutor { pool, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `op` atomically, retrying transient failures.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let sale = executor
    ///     .run("create_sale", |mut tx| async move {
    ///         let result = SaleRepository::insert_with(&mut tx, &payload, &actor).await;
    ///         (tx, result)
    ///     })
    ///     .await?;
    /// ```
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(Tx) -> Fut,
        Fut: Future<Output = (Tx, Result<T, E>)>,
        E: From<DbError> + TransientError + fmt::Display,
    {
        let mut backoff = self.policy.create_backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match self.attempt(&mut op).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt <= self.policy.max_retries => {
                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!(operation, attempts = attempt, error = %err, "Retries exhausted");
                    } else {
                        debug!(operation, error = %err, "Operation failed, rolled back");
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn attempt<T, E, F, Fut>(&self, op: &mut F) -> Result<T, E>
    where
        F: FnMut(Tx) -> Fut,
        Fut: Future<Output = (Tx, Result<T, E>)>,
        E: From<DbError> + fmt::Display,
    {
        let tx = self.pool.begin().await.map_err(DbError::from)?;
        let (tx, result) = op(tx).await;

        match result {
            Ok(value) => {
                tx.commit().await.map_err(DbError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
