//! # cfs-core — Foundational Types for the Campus Finance Stack
//!
//! This crate is the bedrock of the Campus Finance Stack. It defines the
//! primitives every other crate builds on: entity id newtypes and
//! fixed-point money arithmetic with a single, explicit rounding policy.
//! Every other crate in the workspace depends on `cfs-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `TaxRuleId`, `PeriodId`,
//!    `RunId`, `EmployeeId`, `TransactionId`, `InvoiceId`, `BudgetId` —
//!    all newtypes over `Uuid`. No bare strings or naked UUIDs crossing
//!    module seams.
//!
//! 2. **Integer money.** All amounts are `i64` minor units (cents).
//!    Decimal strings at the boundary, integers inside, `checked_*`
//!    arithmetic throughout. Floats are never accepted for amounts.
//!
//! 3. **One rounding policy.** Round-half-even to the minor unit, applied
//!    by `money::apply_rate_bps` and `money::prorate`. No call site
//!    rounds on its own.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cfs-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod ids;
pub mod money;

pub use ids::{BudgetId, EmployeeId, InvoiceId, PeriodId, RunId, TaxRuleId, TransactionId};
pub use money::{
    apply_rate_bps, format_amount, format_rate_bps, parse_amount, parse_rate, prorate, MoneyError,
    RATE_SCALE,
};
