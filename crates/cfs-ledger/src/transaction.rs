//! # Transactions
//!
//! The ledger's unit of record. Amounts are signed per type convention:
//! money flowing in (Income, InvoiceSettlement) is positive, money
//! flowing out (Expense, PayrollDisbursement) is negative. The ledger
//! rejects zero and wrong-signed amounts at the door, so the running
//! balance is always the plain sum of the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cfs_core::{InvoiceId, RunId, TransactionId};

/// Classification of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money in: fees, grants, donations.
    Income,
    /// Money out: supplies, maintenance, utilities.
    Expense,
    /// Money out: one per pay slip at disbursement.
    PayrollDisbursement,
    /// Money in: settlement recorded against an externally issued
    /// invoice.
    InvoiceSettlement,
}

impl TransactionType {
    /// String form used in the API and persisted rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::PayrollDisbursement => "PAYROLL_DISBURSEMENT",
            Self::InvoiceSettlement => "INVOICE_SETTLEMENT",
        }
    }

    /// All transaction types.
    pub fn all() -> [TransactionType; 4] {
        [
            Self::Income,
            Self::Expense,
            Self::PayrollDisbursement,
            Self::InvoiceSettlement,
        ]
    }

    /// Whether `amount_cents` carries the sign this type requires.
    /// Zero is never valid.
    pub fn sign_matches(&self, amount_cents: i64) -> bool {
        match self {
            Self::Income | Self::InvoiceSettlement => amount_cents > 0,
            Self::Expense | Self::PayrollDisbursement => amount_cents < 0,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional link from a transaction back to the record that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TransactionRef {
    /// Emitted by disbursing this payroll run.
    PayrollRun(RunId),
    /// Payment or settlement against this invoice.
    Invoice(InvoiceId),
}

/// A committed, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id, assigned on append.
    pub id: TransactionId,
    /// Classification.
    pub tx_type: TransactionType,
    /// Signed amount in cents.
    pub amount_cents: i64,
    /// Free-form category, e.g. `"Supplies"` or `"Salaries"`.
    pub category: String,
    /// When the transaction occurred.
    pub timestamp: DateTime<Utc>,
    /// Link to the originating payroll run or invoice, if any.
    pub reference: Option<TransactionRef>,
}

/// A transaction not yet committed to the log.
///
/// The ledger assigns the id; everything else is caller-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Classification.
    pub tx_type: TransactionType,
    /// Signed amount in cents.
    pub amount_cents: i64,
    /// Free-form category.
    pub category: String,
    /// When the transaction occurred.
    pub timestamp: DateTime<Utc>,
    /// Link to the originating record, if any.
    pub reference: Option<TransactionRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_convention_per_type() {
        assert!(TransactionType::Income.sign_matches(100));
        assert!(!TransactionType::Income.sign_matches(-100));
        assert!(TransactionType::Expense.sign_matches(-100));
        assert!(!TransactionType::Expense.sign_matches(100));
        assert!(TransactionType::PayrollDisbursement.sign_matches(-1));
        assert!(TransactionType::InvoiceSettlement.sign_matches(1));
    }

    #[test]
    fn zero_never_matches_any_type() {
        for tx_type in TransactionType::all() {
            assert!(!tx_type.sign_matches(0), "{tx_type} accepted zero");
        }
    }

    #[test]
    fn type_serializes_screaming_snake() {
        let json = serde_json::to_string(&TransactionType::PayrollDisbursement).unwrap();
        assert_eq!(json, "\"PAYROLL_DISBURSEMENT\"");
    }
}
