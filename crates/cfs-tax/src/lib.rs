//! # cfs-tax — Tax Rule Registry & Salary Policy Resolver
//!
//! Two shared-read, single-writer resources consumed by the payroll run
//! engine:
//!
//! - The **tax rule registry**: named, effective-dated tax rates. Edits
//!   are append-only (a rate change closes the old rule and adds a new
//!   one), and any computation reads through a [`TaxSnapshot`] pinned to
//!   a single date, so historical payroll runs remain reproducible no
//!   matter how rates change later.
//! - The **salary policy set**: role → gross-pay formula (base salary
//!   plus allowances, prorated for mid-period hires). Resolution is a
//!   pure function of the employee snapshot, the period bounds, and the
//!   policy set — no hidden state.
//!
//! ## Determinism
//!
//! Snapshots and listings iterate in sorted order (`BTreeMap`), and all
//! rounding goes through `cfs-core`'s single rounding policy.

pub mod error;
pub mod policy;
pub mod registry;

pub use error::TaxError;
pub use policy::{Allowance, Employee, EmployeeStatus, PolicySet, SalaryPolicy};
pub use registry::{SnapshotRate, TaxRegistry, TaxRule, TaxSnapshot};
