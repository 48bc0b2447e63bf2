//! # Salary Policy Resolver
//!
//! Maps an employee's role to a gross-pay amount for a pay period:
//! base salary plus allowances, prorated by calendar days for employees
//! hired mid-period.
//!
//! Resolution is a pure function of (employee snapshot, period bounds,
//! policy set) — no hidden state — which keeps payroll runs reproducible
//! and directly testable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::{money, EmployeeId, MoneyError};

use crate::error::TaxError;

/// Employment status in the external employee management system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    /// On payroll; included in runs.
    Active,
    /// Off payroll; skipped by runs.
    Inactive,
}

/// Snapshot of an employee, as looked up from employee management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Employee id (owned externally).
    pub id: EmployeeId,
    /// Role used for policy lookup, e.g. `"Teacher"`.
    pub role: String,
    /// First day of employment.
    pub hire_date: NaiveDate,
    /// Current employment status.
    pub status: EmployeeStatus,
}

/// A recurring allowance on top of base salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    /// Allowance label, e.g. `"Housing"`.
    pub name: String,
    /// Per-period amount in cents.
    pub amount_cents: i64,
}

/// Gross-pay formula for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryPolicy {
    /// Role this policy covers.
    pub role: String,
    /// Base salary per period, in cents.
    pub base_cents: i64,
    /// ISO currency code.
    pub currency: String,
    /// Allowances added to the base.
    pub allowances: Vec<Allowance>,
}

impl SalaryPolicy {
    /// Base plus all allowances, before proration.
    fn full_gross_cents(&self) -> Result<i64, MoneyError> {
        self.allowances
            .iter()
            .try_fold(self.base_cents, |acc, a| acc.checked_add(a.amount_cents))
            .ok_or(MoneyError::Overflow {
                operation: "full_gross_cents",
            })
    }
}

/// The set of salary policies, keyed by role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicySet {
    policies: BTreeMap<String, SalaryPolicy>,
}

impl PolicySet {
    /// Create an empty policy set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the policy for its role.
    pub fn upsert(&mut self, policy: SalaryPolicy) {
        self.policies.insert(policy.role.clone(), policy);
    }

    /// Look up the policy for a role.
    pub fn get(&self, role: &str) -> Option<&SalaryPolicy> {
        self.policies.get(role)
    }

    /// List policies in role order.
    pub fn list(&self) -> impl Iterator<Item = &SalaryPolicy> {
        self.policies.values()
    }

    /// Resolve the gross pay for `employee` over `[period_start, period_end]`.
    ///
    /// Employees hired on or before the period start earn the full
    /// amount; a mid-period hire earns `days_active / days_in_period`
    /// of base and allowances, rounded half-even. Fails with
    /// [`TaxError::PolicyNotFound`] when no policy covers the role.
    pub fn resolve_gross(
        &self,
        employee: &Employee,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<i64, TaxError> {
        let policy = self
            .get(&employee.role)
            .ok_or_else(|| TaxError::PolicyNotFound {
                role: employee.role.clone(),
            })?;
        let full = policy.full_gross_cents()?;

        let days_total = (period_end - period_start).num_days() + 1;
        let days_active = if employee.hire_date <= period_start {
            days_total
        } else if employee.hire_date > period_end {
            0
        } else {
            (period_end - employee.hire_date).num_days() + 1
        };
        Ok(money::prorate(full, days_active, days_total)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn teacher_policy() -> SalaryPolicy {
        SalaryPolicy {
            role: "Teacher".to_string(),
            base_cents: 100_000, // 1000.00
            currency: "USD".to_string(),
            allowances: vec![],
        }
    }

    fn employee(role: &str, hired: NaiveDate) -> Employee {
        Employee {
            id: EmployeeId::new(),
            role: role.to_string(),
            hire_date: hired,
            status: EmployeeStatus::Active,
        }
    }

    #[test]
    fn full_period_gross_is_base() {
        let mut policies = PolicySet::new();
        policies.upsert(teacher_policy());

        let gross = policies
            .resolve_gross(
                &employee("Teacher", date(2023, 9, 1)),
                date(2024, 1, 1),
                date(2024, 1, 31),
            )
            .unwrap();
        assert_eq!(gross, 100_000);
    }

    #[test]
    fn allowances_add_to_base() {
        let mut policy = teacher_policy();
        policy.allowances = vec![
            Allowance {
                name: "Housing".to_string(),
                amount_cents: 20_000,
            },
            Allowance {
                name: "Transport".to_string(),
                amount_cents: 5_000,
            },
        ];
        let mut policies = PolicySet::new();
        policies.upsert(policy);

        let gross = policies
            .resolve_gross(
                &employee("Teacher", date(2023, 9, 1)),
                date(2024, 1, 1),
                date(2024, 1, 31),
            )
            .unwrap();
        assert_eq!(gross, 125_000);
    }

    #[test]
    fn mid_period_hire_is_prorated_by_days() {
        let mut policies = PolicySet::new();
        policies.upsert(teacher_policy());

        // Hired Jan 17 in a 31-day January: 15 active days.
        let gross = policies
            .resolve_gross(
                &employee("Teacher", date(2024, 1, 17)),
                date(2024, 1, 1),
                date(2024, 1, 31),
            )
            .unwrap();
        // 100000 * 15 / 31 = 48387.09... -> 48387
        assert_eq!(gross, 48_387);
    }

    #[test]
    fn hire_after_period_end_earns_zero() {
        let mut policies = PolicySet::new();
        policies.upsert(teacher_policy());

        let gross = policies
            .resolve_gross(
                &employee("Teacher", date(2024, 2, 10)),
                date(2024, 1, 1),
                date(2024, 1, 31),
            )
            .unwrap();
        assert_eq!(gross, 0);
    }

    #[test]
    fn unknown_role_is_policy_not_found() {
        let policies = PolicySet::new();
        let err = policies
            .resolve_gross(
                &employee("Janitor", date(2024, 1, 1)),
                date(2024, 1, 1),
                date(2024, 1, 31),
            )
            .unwrap_err();
        assert!(matches!(err, TaxError::PolicyNotFound { role } if role == "Janitor"));
    }

    #[test]
    fn upsert_replaces_existing_role_policy() {
        let mut policies = PolicySet::new();
        policies.upsert(teacher_policy());
        let mut raised = teacher_policy();
        raised.base_cents = 120_000;
        policies.upsert(raised);

        assert_eq!(policies.get("Teacher").unwrap().base_cents, 120_000);
        assert_eq!(policies.list().count(), 1);
    }
}
