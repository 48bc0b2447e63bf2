//! # Payroll Run Engine
//!
//! Orchestrates the payroll lifecycle over a [`PeriodScheduler`] and a
//! set of [`PayrollRun`]s. The book is a single-writer value: the owner
//! serializes mutations (the API layer holds it behind one write lock),
//! which makes the duplicate-run check atomic with run insertion — two
//! concurrent `create_run` calls for the same period cannot both
//! succeed.
//!
//! ## Disbursement atomicity
//!
//! `disburse` hands the ledger one transaction batch. The ledger
//! validates the whole batch before applying any of it, so either all N
//! slip transactions commit and the run becomes Disbursed, or zero
//! commit and the run stays Approved for retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::{money, MoneyError, PeriodId, RunId};
use cfs_ledger::{Ledger, Transaction, TransactionDraft, TransactionRef, TransactionType};
use cfs_tax::{Employee, EmployeeStatus, PolicySet, TaxRegistry, TaxSnapshot};

use crate::error::PayrollError;
use crate::period::{PeriodScheduler, PeriodStatus};
use crate::run::{ApprovalMode, PaySlip, PayrollRun, RunStatus};

/// Ledger category for payroll disbursement transactions.
pub const DISBURSEMENT_CATEGORY: &str = "Salaries";

/// The payroll book: periods plus runs, mutated as one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollBook {
    /// Period generation and lifecycle.
    pub scheduler: PeriodScheduler,
    runs: BTreeMap<RunId, PayrollRun>,
}

impl PayrollBook {
    /// Create a book over the given scheduler.
    pub fn new(scheduler: PeriodScheduler) -> Self {
        Self {
            scheduler,
            runs: BTreeMap::new(),
        }
    }

    /// Create a Draft run for a period and move the period to
    /// Processing.
    ///
    /// Fails with [`PayrollError::DuplicateRun`] if a live (non-
    /// rejected) run already exists for the period; the duplicate check
    /// and the insertion happen in one critical section. Cancelled or
    /// already-processing periods fail the period transition guard.
    pub fn create_run(
        &mut self,
        period_id: PeriodId,
        approval_mode: ApprovalMode,
        now: DateTime<Utc>,
    ) -> Result<RunId, PayrollError> {
        if self
            .runs
            .values()
            .any(|run| run.period_id == period_id && run.blocks_period())
        {
            return Err(PayrollError::DuplicateRun { period_id });
        }
        // Scheduled -> Processing; rejects Cancelled/Completed periods.
        self.scheduler
            .get_mut(period_id)?
            .transition(PeriodStatus::Processing)?;

        let run = PayrollRun::new(period_id, approval_mode, now);
        let run_id = run.id;
        self.runs.insert(run_id, run);
        Ok(run_id)
    }

    /// Compute pay slips for a run from one pinned tax snapshot.
    ///
    /// Deterministic: slips are built in employee-id order for Active
    /// employees, every slip uses the same snapshot, and the slip set is
    /// replaced atomically — a failure partway leaves the previous slips
    /// in place. Allowed in Draft and PendingApproval (recompute before
    /// approval); afterwards the run is frozen.
    ///
    /// On success the run advances: Draft → Approved in Automatic mode
    /// (computation succeeded for 100% of employees by construction),
    /// Draft → PendingApproval in Manual mode.
    pub fn compute(
        &mut self,
        run_id: RunId,
        employees: &[Employee],
        policies: &PolicySet,
        snapshot: &TaxSnapshot,
        now: DateTime<Utc>,
    ) -> Result<usize, PayrollError> {
        let run = self
            .runs
            .get(&run_id)
            .ok_or(PayrollError::RunNotFound { id: run_id })?;
        if !matches!(run.status, RunStatus::Draft | RunStatus::PendingApproval) {
            return Err(PayrollError::InvalidRunTransition {
                id: run_id,
                from: run.status.as_str(),
                to: run.status.as_str(),
                reason: "slips are frozen once the run is approved".to_string(),
            });
        }
        let period = self
            .scheduler
            .get(run.period_id)
            .ok_or(PayrollError::PeriodNotFound { id: run.period_id })?
            .clone();

        let mut roster: Vec<&Employee> = employees
            .iter()
            .filter(|e| e.status == EmployeeStatus::Active)
            .collect();
        roster.sort_by_key(|e| e.id);

        // Build the full slip set before touching the run.
        let mut slips = Vec::with_capacity(roster.len());
        for employee in roster {
            let gross = policies.resolve_gross(employee, period.start_date, period.end_date)?;
            if gross == 0 {
                // Hired after the period ended; nothing to pay.
                continue;
            }
            let mut tax_breakdown = BTreeMap::new();
            let mut total_tax = 0i64;
            for (name, rate) in snapshot.rates() {
                let amount = money::apply_rate_bps(gross, rate.rate_bps)?;
                total_tax =
                    total_tax
                        .checked_add(amount)
                        .ok_or(MoneyError::Overflow {
                            operation: "slip tax total",
                        })?;
                tax_breakdown.insert(name.to_string(), amount);
            }
            let net = gross.checked_sub(total_tax).ok_or(MoneyError::Overflow {
                operation: "slip net",
            })?;
            if net < 0 {
                return Err(PayrollError::Money(MoneyError::InvalidAmount {
                    input: money::format_amount(net),
                    reason: format!(
                        "withholding exceeds gross for employee {}",
                        employee.id
                    ),
                }));
            }
            slips.push(PaySlip {
                run_id,
                employee_id: employee.id,
                gross_cents: gross,
                tax_breakdown,
                net_cents: net,
            });
        }

        let run = self
            .runs
            .get_mut(&run_id)
            .ok_or(PayrollError::RunNotFound { id: run_id })?;
        let count = slips.len();
        run.slips = slips;
        run.snapshot_rule_ids = snapshot.rule_ids();

        if run.status == RunStatus::Draft {
            match run.approval_mode {
                ApprovalMode::Automatic => {
                    run.transition(RunStatus::Approved, now, "computed; automatic approval")?
                }
                ApprovalMode::Manual => {
                    run.transition(RunStatus::PendingApproval, now, "computed")?
                }
            }
        }
        Ok(count)
    }

    /// Approve a PendingApproval run.
    pub fn approve(&mut self, run_id: RunId, now: DateTime<Utc>) -> Result<(), PayrollError> {
        self.run_mut(run_id)?
            .transition(RunStatus::Approved, now, "approved by operator")
    }

    /// Reject a PendingApproval run. Terminal for the run; the period
    /// returns to Scheduled for a re-run.
    pub fn reject(
        &mut self,
        run_id: RunId,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), PayrollError> {
        let period_id = {
            let run = self.run_mut(run_id)?;
            run.transition(RunStatus::Rejected, now, reason)?;
            run.period_id
        };
        self.scheduler
            .get_mut(period_id)?
            .transition(PeriodStatus::Scheduled)?;
        Ok(())
    }

    /// Disburse an Approved run: one PayrollDisbursement transaction
    /// per slip, as a single all-or-nothing ledger batch.
    ///
    /// On batch failure nothing is recorded and the run stays Approved
    /// (retry is the recovery path). On success the run becomes
    /// Disbursed, the period Completed, and the pinned tax rules are
    /// frozen against deletion.
    pub fn disburse(
        &mut self,
        run_id: RunId,
        ledger: &mut Ledger,
        registry: &mut TaxRegistry,
        now: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, PayrollError> {
        let run = self
            .runs
            .get(&run_id)
            .ok_or(PayrollError::RunNotFound { id: run_id })?;
        if run.status != RunStatus::Approved {
            return Err(PayrollError::InvalidRunTransition {
                id: run_id,
                from: run.status.as_str(),
                to: RunStatus::Disbursed.as_str(),
                reason: "only approved runs can be disbursed".to_string(),
            });
        }

        let drafts: Vec<TransactionDraft> = run
            .slips
            .iter()
            .filter(|slip| slip.net_cents > 0)
            .map(|slip| TransactionDraft {
                tx_type: TransactionType::PayrollDisbursement,
                amount_cents: -slip.net_cents,
                category: DISBURSEMENT_CATEGORY.to_string(),
                timestamp: now,
                reference: Some(TransactionRef::PayrollRun(run_id)),
            })
            .collect();

        // All-or-nothing: an error here leaves the run Approved with
        // zero transactions recorded.
        let committed = ledger.record_batch(drafts)?;

        let period_id = run.period_id;
        let rule_ids = run.snapshot_rule_ids.clone();
        self.run_mut(run_id)?
            .transition(RunStatus::Disbursed, now, "disbursed to ledger")?;
        self.scheduler
            .get_mut(period_id)?
            .transition(PeriodStatus::Completed)?;
        registry.mark_referenced(rule_ids);
        Ok(committed)
    }

    /// Look up a run.
    pub fn get_run(&self, run_id: RunId) -> Option<&PayrollRun> {
        self.runs.get(&run_id)
    }

    /// A run's slips, if the run exists.
    pub fn slips(&self, run_id: RunId) -> Result<&[PaySlip], PayrollError> {
        self.runs
            .get(&run_id)
            .map(|run| run.slips.as_slice())
            .ok_or(PayrollError::RunNotFound { id: run_id })
    }

    /// Runs, optionally filtered by status, ordered by creation time.
    pub fn list_runs(&self, status: Option<RunStatus>) -> Vec<&PayrollRun> {
        let mut runs: Vec<&PayrollRun> = self
            .runs
            .values()
            .filter(|run| status.map_or(true, |s| run.status == s))
            .collect();
        runs.sort_by_key(|run| run.created_at);
        runs
    }

    fn run_mut(&mut self, run_id: RunId) -> Result<&mut PayrollRun, PayrollError> {
        self.runs
            .get_mut(&run_id)
            .ok_or(PayrollError::RunNotFound { id: run_id })
    }
}
