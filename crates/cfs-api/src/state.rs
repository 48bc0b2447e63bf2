//! # Application State
//!
//! Shared state for the Axum application, passed to handlers via the
//! `State` extractor.
//!
//! ## Locking
//!
//! Domain books are single-writer value types; each lives behind a
//! `parking_lot::RwLock` (non-poisoning, and never held across an
//! `.await`). Compound operations take the locks they need inside one
//! handler-side critical section, in a fixed order — payroll, then
//! finance, then tax — so the duplicate-run check, a disbursement
//! batch, and an invoice payment are each atomic from any observer's
//! point of view.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use cfs_ledger::{FinanceBook, Ledger};
use cfs_payroll::{Cadence, PayrollBook, PeriodScheduler};
use cfs_tax::{PolicySet, TaxRegistry};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store for simple lookup
/// records (currently the employee directory stand-in).
///
/// Synchronous on purpose: the lock is `parking_lot`, not `tokio::sync`,
/// because it is never held across an `.await` point.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// All records, in unspecified order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Payroll cadence for the period scheduler.
    pub cadence: Cadence,
    /// Start date of the first pay period.
    pub anchor: NaiveDate,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cadence: Cadence::Monthly,
            // January 1st of the rollout year; overridden via
            // PAYROLL_ANCHOR in deployments.
            anchor: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly: every field is an `Arc` or cheap handle.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Employee lookup store (seeded snapshot of the external employee
    /// management system).
    pub employees: Store<cfs_tax::Employee>,
    /// Effective-dated tax rules.
    pub tax: Arc<RwLock<TaxRegistry>>,
    /// Role → gross-pay policies.
    pub policies: Arc<RwLock<PolicySet>>,
    /// Pay periods and payroll runs.
    pub payroll: Arc<RwLock<PayrollBook>>,
    /// Ledger, invoices, budgets — one lock so compound financial
    /// operations commit atomically.
    pub finance: Arc<RwLock<FinanceBook>>,
    /// PostgreSQL pool for durable transaction persistence. `None`
    /// means in-memory-only mode.
    pub db_pool: Option<PgPool>,
    /// Static configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create state with default configuration and no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create state with the given configuration and optional pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let scheduler = PeriodScheduler::new(config.cadence, config.anchor);
        Self {
            employees: Store::new(),
            tax: Arc::new(RwLock::new(TaxRegistry::new())),
            policies: Arc::new(RwLock::new(PolicySet::new())),
            payroll: Arc::new(RwLock::new(PayrollBook::new(scheduler))),
            finance: Arc::new(RwLock::new(FinanceBook::new())),
            db_pool,
            config,
        }
    }

    /// Hydrate the ledger from the database.
    ///
    /// Called once on startup when a pool is available, so reads stay
    /// fast and synchronous afterwards. The persisted log is
    /// re-validated; a corrupt row aborts startup rather than seeding a
    /// ledger that cannot balance.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let rows = crate::db::transactions::load_all(pool)
            .await
            .map_err(|e| format!("failed to load transactions: {e}"))?;
        let count = rows.len();
        let ledger =
            Ledger::from_transactions(rows).map_err(|e| format!("ledger hydration failed: {e}"))?;
        self.finance.write().ledger = ledger;

        tracing::info!(transactions = count, "hydrated ledger from database");
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
