//! # cfs-analytics — Read Projections
//!
//! Pure read-side aggregations over ledger and payroll history,
//! consumed by the dashboard layer. No independent counters are
//! maintained anywhere here: every number is derived from the
//! authoritative records at call time, so a stale-counter bug is
//! unrepresentable.
//!
//! Only Disbursed runs contribute to salary statistics — money that
//! never moved is not salary history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::EmployeeId;
use cfs_ledger::Ledger;
use cfs_payroll::{PayrollRun, RunStatus};
use cfs_tax::Employee;

/// Per-role salary statistics over a range of disbursed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSalaryStats {
    /// Number of slips contributing.
    pub slip_count: u64,
    /// Sum of net pay, in cents.
    pub total_net_cents: i64,
    /// Mean net pay per slip, in cents.
    pub average_net_cents: i64,
}

/// One month of income/expense totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1–12.
    pub month: u32,
    /// Money in, in cents.
    pub income_cents: i64,
    /// Money out (magnitude), in cents.
    pub expense_cents: i64,
}

fn in_range(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |f| at >= f) && to.map_or(true, |t| at <= t)
}

/// Average net pay per role over disbursed runs in the range.
///
/// Roles come from the employee snapshots; slips whose employee is no
/// longer resolvable are skipped rather than guessed. Output is sorted
/// by role name.
pub fn average_net_by_role<'a>(
    runs: impl IntoIterator<Item = &'a PayrollRun>,
    employees: &[Employee],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> BTreeMap<String, RoleSalaryStats> {
    let roles: BTreeMap<EmployeeId, &str> = employees
        .iter()
        .map(|e| (e.id, e.role.as_str()))
        .collect();

    let mut totals: BTreeMap<String, (u64, i64)> = BTreeMap::new();
    for run in runs {
        if run.status != RunStatus::Disbursed || !in_range(run.created_at, from, to) {
            continue;
        }
        for slip in &run.slips {
            let Some(role) = roles.get(&slip.employee_id) else {
                continue;
            };
            let entry = totals.entry(role.to_string()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 = entry.1.saturating_add(slip.net_cents);
        }
    }

    totals
        .into_iter()
        .map(|(role, (count, total))| {
            (
                role,
                RoleSalaryStats {
                    slip_count: count,
                    total_net_cents: total,
                    average_net_cents: total / count as i64,
                },
            )
        })
        .collect()
}

/// Monthly income/expense buckets over the ledger, ascending by month.
pub fn monthly_trend(
    ledger: &Ledger,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<MonthBucket> {
    ledger
        .monthly_totals(from, to)
        .into_iter()
        .map(|((year, month), (income, expense))| MonthBucket {
            year,
            month,
            income_cents: income,
            expense_cents: expense,
        })
        .collect()
}

/// Total withheld per tax name over disbursed runs in the range,
/// sorted by tax name.
pub fn tax_totals<'a>(
    runs: impl IntoIterator<Item = &'a PayrollRun>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> BTreeMap<String, i64> {
    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for run in runs {
        if run.status != RunStatus::Disbursed || !in_range(run.created_at, from, to) {
            continue;
        }
        for slip in &run.slips {
            for (name, amount) in &slip.tax_breakdown {
                let entry = totals.entry(name.clone()).or_insert(0);
                *entry = entry.saturating_add(*amount);
            }
        }
    }
    totals
}
