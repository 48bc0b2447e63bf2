//! # cfs-ledger — Financial Ledger, Invoices & Budgets
//!
//! The accounting core: an append-only transaction log with a derived,
//! incrementally-maintained balance, plus the invoice lifecycle and
//! budget allocations that reconcile against it.
//!
//! ## Design
//!
//! - The transaction log is never edited; corrections are new
//!   transactions. The cached balance is a strictly derived projection —
//!   [`Ledger::recompute_from_scratch`] and [`Ledger::verify_balance`]
//!   exist so drift is detectable, never silently absorbed.
//! - Batch appends ([`Ledger::record_batch`]) validate every entry,
//!   including cumulative overflow, before applying any. Payroll
//!   disbursement rides on this for its all-or-nothing guarantee.
//! - Budget consumption is derived from Expense transactions at read
//!   time. There is no separately incremented counter to drift.

pub mod budget;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod transaction;

pub use budget::{Budget, BudgetBook};
pub use error::LedgerError;
pub use invoice::{Invoice, InvoiceBook, InvoiceStatus};
pub use ledger::{Ledger, LedgerSummary};
pub use transaction::{Transaction, TransactionDraft, TransactionRef, TransactionType};

use serde::{Deserialize, Serialize};

/// The whole financial book: ledger, invoices, budgets.
///
/// Owners place this behind a single write lock so that compound
/// operations (an invoice payment and its ledger transaction, a payroll
/// disbursement batch) commit as one atomic unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinanceBook {
    /// The append-only transaction log.
    pub ledger: Ledger,
    /// Invoice lifecycle state.
    pub invoices: InvoiceBook,
    /// Budget allocations.
    pub budgets: BudgetBook,
}

impl FinanceBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }
}
