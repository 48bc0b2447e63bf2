//! Error types for the ledger, invoice, and budget components.

use cfs_core::{BudgetId, InvoiceId};
use thiserror::Error;

use crate::transaction::TransactionType;

/// Errors raised by the financial book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The transaction amount is zero or its sign violates the type
    /// convention (Income/InvoiceSettlement positive, Expense/
    /// PayrollDisbursement negative).
    #[error("invalid amount {amount_cents} for {tx_type} transaction: {reason}")]
    InvalidAmount {
        /// The transaction type being recorded.
        tx_type: TransactionType,
        /// The offending amount in cents.
        amount_cents: i64,
        /// Why the amount was rejected.
        reason: &'static str,
    },

    /// A balance update would exceed the representable range. Nothing
    /// was applied.
    #[error("arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// The operation that overflowed.
        operation: &'static str,
    },

    /// The cached balance disagrees with a full recomputation. This is
    /// a consistency fault: the book is frozen for operator attention,
    /// never silently corrected.
    #[error("balance drift detected: cached {cached_cents}, recomputed {recomputed_cents}")]
    BalanceDrift {
        /// The incrementally maintained balance.
        cached_cents: i64,
        /// The balance recomputed from the full log.
        recomputed_cents: i64,
    },

    /// No invoice exists with the given id.
    #[error("invoice {id} not found")]
    InvoiceNotFound {
        /// The missing invoice id.
        id: InvoiceId,
    },

    /// The requested invoice operation is not legal in its current
    /// status.
    #[error("invoice {id} cannot {operation} while {status}")]
    InvalidInvoiceTransition {
        /// The invoice id.
        id: InvoiceId,
        /// The attempted operation.
        operation: &'static str,
        /// The invoice's current status name.
        status: &'static str,
    },

    /// A payment would push `amount_paid` past `amount_due`.
    #[error(
        "payment of {payment_cents} on invoice {id} would exceed amount due \
         ({amount_paid_cents} already paid of {amount_due_cents})"
    )]
    Overpayment {
        /// The invoice id.
        id: InvoiceId,
        /// The attempted payment in cents.
        payment_cents: i64,
        /// Amount already paid in cents.
        amount_paid_cents: i64,
        /// Total due in cents.
        amount_due_cents: i64,
    },

    /// No budget exists with the given id.
    #[error("budget {id} not found")]
    BudgetNotFound {
        /// The missing budget id.
        id: BudgetId,
    },
}
