//! # cfs-payroll — Period Scheduling & the Payroll Run Engine
//!
//! Everything between "a pay period is due" and "salaries hit the
//! ledger":
//!
//! - The **period scheduler** derives contiguous, non-overlapping pay
//!   periods from a cadence (monthly or bi-weekly) and tracks each
//!   period's lifecycle (Scheduled → Processing → Completed, with
//!   Cancelled reachable from Scheduled only).
//! - The **run engine** creates at most one live [`PayrollRun`] per
//!   period, computes pay slips from a salary policy set and a tax
//!   snapshot pinned at the period's payday, drives the approval state
//!   machine, and disburses approved runs into the ledger as one
//!   all-or-nothing transaction batch.
//!
//! ## Determinism
//!
//! `compute` is a pure function of (employees, policies, snapshot,
//! period): slips are built in employee-id order from a single pinned
//! snapshot and replaced atomically, so recomputing a Draft run with the
//! same inputs yields byte-identical slips.
//!
//! ## Audit
//!
//! Every run state change appends a [`TransitionRecord`]; illegal
//! transitions are rejected with a typed error, never no-op'd.

pub mod engine;
pub mod error;
pub mod period;
pub mod run;

pub use engine::{PayrollBook, DISBURSEMENT_CATEGORY};
pub use error::PayrollError;
pub use period::{Cadence, PayPeriod, PeriodScheduler, PeriodStatus};
pub use run::{ApprovalMode, PaySlip, PayrollRun, RunStatus, TransitionRecord};
