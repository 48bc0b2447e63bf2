//! # Payroll Runs & Pay Slips
//!
//! A [`PayrollRun`] is one execution of payroll for one pay period. Its
//! approval lifecycle is an explicit state machine:
//!
//! ```text
//! Draft ──compute──▶ PendingApproval ──▶ Approved ──▶ Disbursed
//!   │                      │
//!   └──compute (automatic)─┴──▶ Rejected (terminal)
//! ```
//!
//! Draft → Approved is the automatic-mode shortcut, taken only when
//! computation succeeds for every employee. Rejected and Disbursed are
//! terminal. Every transition is appended to the run's audit log;
//! illegal ones are rejected with a typed error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::{EmployeeId, MoneyError, PeriodId, RunId, TaxRuleId};

use crate::error::PayrollError;

/// How a computed run reaches Approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalMode {
    /// Approved immediately when computation succeeds for every
    /// employee.
    Automatic,
    /// Waits in PendingApproval for an explicit approve/reject.
    Manual,
}

/// Payroll run lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Created; slips not yet computed.
    Draft,
    /// Computed; awaiting manual approval.
    PendingApproval,
    /// Cleared for disbursement.
    Approved,
    /// Declined. Terminal; the period returns to Scheduled.
    Rejected,
    /// Salaries recorded in the ledger. Terminal; the run is immutable.
    Disbursed,
}

impl RunStatus {
    /// String form used in the API and audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Disbursed => "DISBURSED",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Disbursed)
    }

    fn can_transition(from: RunStatus, to: RunStatus) -> bool {
        matches!(
            (from, to),
            (Self::Draft, Self::PendingApproval)
                | (Self::Draft, Self::Approved)
                | (Self::PendingApproval, Self::Approved)
                | (Self::PendingApproval, Self::Rejected)
                | (Self::Approved, Self::Disbursed)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited state transition on a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from_status: RunStatus,
    /// Status after the transition.
    pub to_status: RunStatus,
    /// When the transition happened.
    pub at: DateTime<Utc>,
    /// Why, e.g. `"computed; automatic approval"`.
    pub reason: String,
}

/// Per-employee computed gross/tax/net breakdown. Derived, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaySlip {
    /// The run this slip belongs to.
    pub run_id: RunId,
    /// The employee paid.
    pub employee_id: EmployeeId,
    /// Gross pay in cents.
    pub gross_cents: i64,
    /// Withheld amount per tax name, in cents, sorted by name.
    pub tax_breakdown: BTreeMap<String, i64>,
    /// Net pay in cents: gross − Σ tax_breakdown.
    pub net_cents: i64,
}

/// One execution of payroll computation + approval + disbursement for a
/// single pay period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Unique run id.
    pub id: RunId,
    /// The period this run pays (1:1 with a non-cancelled period).
    pub period_id: PeriodId,
    /// Approval mode fixed at creation.
    pub approval_mode: ApprovalMode,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// Computed slips, in employee-id order.
    pub slips: Vec<PaySlip>,
    /// Tax rule versions the computation pinned. Marked as referenced
    /// in the registry at disbursement.
    pub snapshot_rule_ids: Vec<TaxRuleId>,
    /// Audit trail of status transitions.
    pub transition_log: Vec<TransitionRecord>,
}

impl PayrollRun {
    /// Create a Draft run for a period.
    pub fn new(period_id: PeriodId, approval_mode: ApprovalMode, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RunId::new(),
            period_id,
            approval_mode,
            status: RunStatus::Draft,
            created_at,
            slips: Vec::new(),
            snapshot_rule_ids: Vec::new(),
            transition_log: Vec::new(),
        }
    }

    /// Guarded status transition; appends to the audit log on success.
    pub fn transition(
        &mut self,
        to: RunStatus,
        at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<(), PayrollError> {
        let reason = reason.into();
        if !RunStatus::can_transition(self.status, to) {
            return Err(PayrollError::InvalidRunTransition {
                id: self.id,
                from: self.status.as_str(),
                to: to.as_str(),
                reason,
            });
        }
        self.transition_log.push(TransitionRecord {
            from_status: self.status,
            to_status: to,
            at,
            reason,
        });
        self.status = to;
        Ok(())
    }

    /// Whether this run blocks another run from being created for its
    /// period. Rejected runs do not: their period went back to
    /// Scheduled for a re-run.
    pub fn blocks_period(&self) -> bool {
        self.status != RunStatus::Rejected
    }

    /// Sum of slip gross amounts, in cents.
    pub fn total_gross_cents(&self) -> Result<i64, MoneyError> {
        self.checked_sum(|slip| slip.gross_cents, "total_gross_cents")
    }

    /// Sum of all withheld tax, in cents.
    pub fn total_tax_cents(&self) -> Result<i64, MoneyError> {
        self.slips
            .iter()
            .flat_map(|slip| slip.tax_breakdown.values())
            .try_fold(0i64, |acc, amount| acc.checked_add(*amount))
            .ok_or(MoneyError::Overflow {
                operation: "total_tax_cents",
            })
    }

    /// Sum of slip net amounts, in cents. Equals the disbursement total.
    pub fn total_net_cents(&self) -> Result<i64, MoneyError> {
        self.checked_sum(|slip| slip.net_cents, "total_net_cents")
    }

    fn checked_sum(
        &self,
        field: impl Fn(&PaySlip) -> i64,
        operation: &'static str,
    ) -> Result<i64, MoneyError> {
        self.slips
            .iter()
            .map(&field)
            .try_fold(0i64, |acc, v| acc.checked_add(v))
            .ok_or(MoneyError::Overflow { operation })
    }
}
