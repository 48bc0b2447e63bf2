//! Error types for period scheduling and the payroll run engine.

use cfs_core::{MoneyError, PeriodId, RunId};
use cfs_ledger::LedgerError;
use cfs_tax::TaxError;
use thiserror::Error;

/// Errors raised by the payroll subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayrollError {
    /// No pay period exists with the given id.
    #[error("pay period {id} not found")]
    PeriodNotFound {
        /// The missing period id.
        id: PeriodId,
    },

    /// No payroll run exists with the given id.
    #[error("payroll run {id} not found")]
    RunNotFound {
        /// The missing run id.
        id: RunId,
    },

    /// A live (non-rejected) run already exists for the period.
    #[error("a payroll run already exists for period {period_id}")]
    DuplicateRun {
        /// The contested period id.
        period_id: PeriodId,
    },

    /// The period cannot move from its current status to the requested
    /// one.
    #[error("pay period {id} cannot transition from {from} to {to}")]
    InvalidPeriodTransition {
        /// The period id.
        id: PeriodId,
        /// Current status name.
        from: &'static str,
        /// Requested status name.
        to: &'static str,
    },

    /// The run cannot move from its current status to the requested one.
    #[error("payroll run {id} cannot transition from {from} to {to}: {reason}")]
    InvalidRunTransition {
        /// The run id.
        id: RunId,
        /// Current status name.
        from: &'static str,
        /// Requested status name.
        to: &'static str,
        /// Why the transition was rejected.
        reason: String,
    },

    /// Slip computation failed in the tax/policy layer.
    #[error(transparent)]
    Tax(#[from] TaxError),

    /// Disbursement failed in the ledger layer. The run remains
    /// Approved and retryable.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Amount arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}
