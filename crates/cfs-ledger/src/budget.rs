//! # Budgets
//!
//! Budget allocations per category and period. Consumption is a derived
//! read over the ledger's Expense transactions — it is never stored, so
//! it can never drift from the log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::BudgetId;

use crate::error::LedgerError;
use crate::ledger::Ledger;

/// A spending allocation for one category over one date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Unique budget id.
    pub id: BudgetId,
    /// Expense category this budget covers.
    pub category: String,
    /// Allocated amount in cents.
    pub allocated_cents: i64,
    /// First day of the budget period (inclusive).
    pub period_start: NaiveDate,
    /// Last day of the budget period (inclusive).
    pub period_end: NaiveDate,
}

impl Budget {
    fn range_utc(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.period_start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = self.period_end.and_hms_opt(23, 59, 59).unwrap_or_default();
        (start.and_utc(), end.and_utc())
    }

    /// Sum of Expense transactions in this budget's category and period,
    /// in cents. Derived from the ledger at call time.
    pub fn consumed(&self, ledger: &Ledger) -> i64 {
        let (from, to) = self.range_utc();
        ledger.expense_total_for_category(&self.category, from, to)
    }

    /// Allocation minus consumption. Negative means overspent.
    pub fn remaining(&self, ledger: &Ledger) -> i64 {
        self.allocated_cents.saturating_sub(self.consumed(ledger))
    }
}

/// All budget allocations, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetBook {
    budgets: BTreeMap<BudgetId, Budget>,
}

impl BudgetBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a budget allocation.
    pub fn create(
        &mut self,
        category: impl Into<String>,
        allocated_cents: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> BudgetId {
        let id = BudgetId::new();
        self.budgets.insert(
            id,
            Budget {
                id,
                category: category.into(),
                allocated_cents,
                period_start,
                period_end,
            },
        );
        id
    }

    /// Look up a budget.
    pub fn get(&self, id: BudgetId) -> Result<&Budget, LedgerError> {
        self.budgets
            .get(&id)
            .ok_or(LedgerError::BudgetNotFound { id })
    }

    /// List budgets in id order.
    pub fn list(&self) -> impl Iterator<Item = &Budget> {
        self.budgets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TransactionDraft, TransactionType};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(amount_cents: i64, category: &str, y: i32, m: u32, d: u32) -> TransactionDraft {
        TransactionDraft {
            tx_type: TransactionType::Expense,
            amount_cents: -amount_cents,
            category: category.to_string(),
            timestamp: Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
            reference: None,
        }
    }

    #[test]
    fn consumed_sums_matching_expenses() {
        let mut book = BudgetBook::new();
        let mut ledger = Ledger::new();
        let id = book.create("Supplies", 50_000, date(2024, 1, 1), date(2024, 12, 31));

        // 200.00 and 150.00 tagged Supplies -> consumed 350.00.
        ledger.record(expense(20_000, "Supplies", 2024, 2, 1)).unwrap();
        ledger.record(expense(15_000, "Supplies", 2024, 3, 1)).unwrap();

        let budget = book.get(id).unwrap();
        assert_eq!(budget.consumed(&ledger), 35_000);
        assert_eq!(budget.remaining(&ledger), 15_000);
    }

    #[test]
    fn consumed_ignores_other_categories_and_periods() {
        let mut book = BudgetBook::new();
        let mut ledger = Ledger::new();
        let id = book.create("Supplies", 50_000, date(2024, 1, 1), date(2024, 6, 30));

        ledger.record(expense(10_000, "Maintenance", 2024, 2, 1)).unwrap();
        ledger.record(expense(10_000, "Supplies", 2024, 8, 1)).unwrap(); // outside period
        ledger.record(expense(10_000, "Supplies", 2024, 2, 1)).unwrap();

        assert_eq!(book.get(id).unwrap().consumed(&ledger), 10_000);
    }

    #[test]
    fn missing_budget_is_typed_error() {
        let book = BudgetBook::new();
        let err = book.get(BudgetId::new()).unwrap_err();
        assert!(matches!(err, LedgerError::BudgetNotFound { .. }));
    }
}
