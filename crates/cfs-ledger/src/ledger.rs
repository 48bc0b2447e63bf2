//! # Ledger
//!
//! Append-only transaction log with a derived, incrementally maintained
//! balance.
//!
//! ## Consistency
//!
//! The cached balance is updated in the same critical section as the
//! append — a reader holding the owner's lock never sees a transaction
//! without its balance effect. The cache is strictly derived:
//! [`Ledger::recompute_from_scratch`] rebuilds it from the log and
//! [`Ledger::verify_balance`] turns any disagreement into a typed
//! consistency fault instead of silently patching it.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::TransactionId;

use crate::error::LedgerError;
use crate::transaction::{Transaction, TransactionDraft, TransactionType};

/// Income and expense totals over the full log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Sum of all positive amounts, in cents.
    pub income_cents: i64,
    /// Sum of the magnitudes of all negative amounts, in cents.
    pub expense_cents: i64,
    /// Net balance (income − expense), in cents.
    pub balance_cents: i64,
}

/// The append-only financial transaction log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    log: Vec<Transaction>,
    balance_cents: i64,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from previously committed transactions,
    /// preserving their ids. Used when hydrating from persistent
    /// storage. Every entry is re-validated; the balance is computed
    /// from scratch.
    pub fn from_transactions(log: Vec<Transaction>) -> Result<Self, LedgerError> {
        let mut balance = 0i64;
        for tx in &log {
            if tx.amount_cents == 0 || !tx.tx_type.sign_matches(tx.amount_cents) {
                return Err(LedgerError::InvalidAmount {
                    tx_type: tx.tx_type,
                    amount_cents: tx.amount_cents,
                    reason: "persisted transaction violates sign convention",
                });
            }
            balance = balance.checked_add(tx.amount_cents).ok_or(
                LedgerError::ArithmeticOverflow {
                    operation: "from_transactions",
                },
            )?;
        }
        Ok(Self {
            log,
            balance_cents: balance,
        })
    }

    fn validate(draft: &TransactionDraft) -> Result<(), LedgerError> {
        if draft.amount_cents == 0 {
            return Err(LedgerError::InvalidAmount {
                tx_type: draft.tx_type,
                amount_cents: 0,
                reason: "amount must not be zero",
            });
        }
        if !draft.tx_type.sign_matches(draft.amount_cents) {
            return Err(LedgerError::InvalidAmount {
                tx_type: draft.tx_type,
                amount_cents: draft.amount_cents,
                reason: "sign violates type convention",
            });
        }
        Ok(())
    }

    /// Append one transaction and update the cached balance.
    ///
    /// Validation failures and overflow leave the ledger untouched.
    pub fn record(&mut self, draft: TransactionDraft) -> Result<Transaction, LedgerError> {
        Self::validate(&draft)?;
        let new_balance = self
            .balance_cents
            .checked_add(draft.amount_cents)
            .ok_or(LedgerError::ArithmeticOverflow { operation: "record" })?;

        let transaction = Transaction {
            id: TransactionId::new(),
            tx_type: draft.tx_type,
            amount_cents: draft.amount_cents,
            category: draft.category,
            timestamp: draft.timestamp,
            reference: draft.reference,
        };
        self.log.push(transaction.clone());
        self.balance_cents = new_balance;
        Ok(transaction)
    }

    /// Append a batch of transactions as one all-or-nothing unit.
    ///
    /// Every draft is validated — including the cumulative balance for
    /// overflow — before any is applied. On error, zero transactions are
    /// recorded and the balance is unchanged.
    pub fn record_batch(
        &mut self,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut projected = self.balance_cents;
        for draft in &drafts {
            Self::validate(draft)?;
            projected = projected.checked_add(draft.amount_cents).ok_or(
                LedgerError::ArithmeticOverflow {
                    operation: "record_batch",
                },
            )?;
        }

        let committed: Vec<Transaction> = drafts
            .into_iter()
            .map(|draft| Transaction {
                id: TransactionId::new(),
                tx_type: draft.tx_type,
                amount_cents: draft.amount_cents,
                category: draft.category,
                timestamp: draft.timestamp,
                reference: draft.reference,
            })
            .collect();
        self.log.extend(committed.iter().cloned());
        self.balance_cents = projected;
        Ok(committed)
    }

    /// The cached running balance, in cents.
    pub fn balance(&self) -> i64 {
        self.balance_cents
    }

    /// Balance considering only transactions at or before `instant`.
    /// Pure read over the log.
    pub fn balance_as_of(&self, instant: DateTime<Utc>) -> i64 {
        self.log
            .iter()
            .filter(|tx| tx.timestamp <= instant)
            .map(|tx| tx.amount_cents)
            .sum()
    }

    /// Signed totals per category, optionally bounded by a time range.
    /// Deterministically ordered by category name.
    pub fn totals_by_category(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BTreeMap<String, i64> {
        let mut totals: BTreeMap<String, i64> = BTreeMap::new();
        for tx in self.range(from, to) {
            *totals.entry(tx.category.clone()).or_insert(0) += tx.amount_cents;
        }
        totals
    }

    /// Income/expense/balance totals over the whole log.
    pub fn summary(&self) -> LedgerSummary {
        let mut income = 0i64;
        let mut expense = 0i64;
        for tx in &self.log {
            if tx.amount_cents > 0 {
                income = income.saturating_add(tx.amount_cents);
            } else {
                expense = expense.saturating_add(-tx.amount_cents);
            }
        }
        LedgerSummary {
            income_cents: income,
            expense_cents: expense,
            balance_cents: self.balance_cents,
        }
    }

    /// Rebuild the balance from the full log with checked arithmetic.
    pub fn recompute_from_scratch(&self) -> Result<i64, LedgerError> {
        self.log
            .iter()
            .try_fold(0i64, |acc, tx| acc.checked_add(tx.amount_cents))
            .ok_or(LedgerError::ArithmeticOverflow {
                operation: "recompute_from_scratch",
            })
    }

    /// Verify the cached balance against a full recomputation.
    ///
    /// A mismatch is a consistency fault ([`LedgerError::BalanceDrift`])
    /// requiring operator attention.
    pub fn verify_balance(&self) -> Result<(), LedgerError> {
        let recomputed = self.recompute_from_scratch()?;
        if recomputed != self.balance_cents {
            return Err(LedgerError::BalanceDrift {
                cached_cents: self.balance_cents,
                recomputed_cents: recomputed,
            });
        }
        Ok(())
    }

    /// All committed transactions, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Transactions within an optional time range, oldest first.
    pub fn range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> impl Iterator<Item = &Transaction> {
        self.log.iter().filter(move |tx| {
            from.map_or(true, |f| tx.timestamp >= f) && to.map_or(true, |t| tx.timestamp <= t)
        })
    }

    /// Expense magnitude for one category within a date range, used for
    /// budget consumption. Counts Expense transactions only.
    pub fn expense_total_for_category(
        &self,
        category: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> i64 {
        self.range(Some(from), Some(to))
            .filter(|tx| tx.tx_type == TransactionType::Expense && tx.category == category)
            .map(|tx| -tx.amount_cents)
            .sum()
    }

    /// Monthly (year, month) → (income, expense) buckets, ordered
    /// ascending. Consumed by the analytics trend projection.
    pub fn monthly_totals(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> BTreeMap<(i32, u32), (i64, i64)> {
        let mut buckets: BTreeMap<(i32, u32), (i64, i64)> = BTreeMap::new();
        for tx in self.range(from, to) {
            let key = (tx.timestamp.year(), tx.timestamp.month());
            let bucket = buckets.entry(key).or_insert((0, 0));
            if tx.amount_cents > 0 {
                bucket.0 = bucket.0.saturating_add(tx.amount_cents);
            } else {
                bucket.1 = bucket.1.saturating_add(-tx.amount_cents);
            }
        }
        buckets
    }
}
