//! # Pay Periods & the Scheduler
//!
//! Pay periods are derived from a cadence configuration and an anchor
//! date, generated contiguously: each period starts the day after the
//! previous one ends, so the sequence is non-overlapping by
//! construction. A cadence change affects only periods generated after
//! it; existing periods are never reshaped.
//!
//! Period lifecycle: Scheduled → Processing → Completed, with
//! Processing → Scheduled when a run is rejected and Scheduled →
//! Cancelled as a manual override. Everything else is an invalid
//! transition.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use cfs_core::PeriodId;

use crate::error::PayrollError;

/// Pay period lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    /// Generated, awaiting a payroll run.
    Scheduled,
    /// A payroll run is in flight.
    Processing,
    /// Disbursed. Terminal.
    Completed,
    /// Manually cancelled before processing. Terminal.
    Cancelled,
}

impl PeriodStatus {
    /// String form used in the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn can_transition(from: PeriodStatus, to: PeriodStatus) -> bool {
        matches!(
            (from, to),
            (Self::Scheduled, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Scheduled)
                | (Self::Scheduled, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payroll cadence: how period boundaries are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cadence {
    /// One period per calendar month from the anchor date.
    Monthly,
    /// Fixed 14-day periods.
    BiWeekly,
}

impl Cadence {
    /// Last day (inclusive) of a period starting at `start`.
    fn period_end(&self, start: NaiveDate) -> NaiveDate {
        match self {
            // One month forward, minus a day. Saturating: the dates in
            // play are centuries away from the representable bounds.
            Self::Monthly => start
                .checked_add_months(Months::new(1))
                .and_then(|d| d.checked_sub_days(Days::new(1)))
                .unwrap_or(start),
            Self::BiWeekly => start.checked_add_days(Days::new(13)).unwrap_or(start),
        }
    }
}

/// One bounded date range for which payroll is computed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    /// Unique period id.
    pub id: PeriodId,
    /// First day (inclusive).
    pub start_date: NaiveDate,
    /// Last day (inclusive).
    pub end_date: NaiveDate,
    /// The date salaries are paid; tax snapshots are pinned here.
    pub payday: NaiveDate,
    /// Lifecycle status.
    pub status: PeriodStatus,
}

impl PayPeriod {
    /// Guarded status transition.
    pub fn transition(&mut self, to: PeriodStatus) -> Result<(), PayrollError> {
        if !PeriodStatus::can_transition(self.status, to) {
            return Err(PayrollError::InvalidPeriodTransition {
                id: self.id,
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Generates and tracks pay periods for one cadence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodScheduler {
    cadence: Cadence,
    /// Start date of the next period to generate. Maintained so the
    /// generated sequence stays contiguous across cadence changes.
    next_start: NaiveDate,
    periods: BTreeMap<PeriodId, PayPeriod>,
}

impl PeriodScheduler {
    /// Create a scheduler whose first period starts at `anchor`.
    pub fn new(cadence: Cadence, anchor: NaiveDate) -> Self {
        Self {
            cadence,
            next_start: anchor,
            periods: BTreeMap::new(),
        }
    }

    /// The active cadence.
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Change the cadence. Only periods generated from now on use the
    /// new boundaries; existing periods are untouched.
    pub fn set_cadence(&mut self, cadence: Cadence) {
        self.cadence = cadence;
    }

    /// Generate every period starting on or before `as_of` that does
    /// not exist yet. Returns the ids of newly created periods in
    /// start-date order.
    pub fn schedule_through(&mut self, as_of: NaiveDate) -> Vec<PeriodId> {
        let mut created = Vec::new();
        while self.next_start <= as_of {
            let start = self.next_start;
            let end = self.cadence.period_end(start);
            let id = PeriodId::new();
            self.periods.insert(
                id,
                PayPeriod {
                    id,
                    start_date: start,
                    end_date: end,
                    payday: end,
                    status: PeriodStatus::Scheduled,
                },
            );
            created.push(id);
            self.next_start = end.checked_add_days(Days::new(1)).unwrap_or(end);
        }
        created
    }

    /// Periods still awaiting a run whose start date has arrived,
    /// ordered by start date ascending. Detects missed/backlogged
    /// periods.
    pub fn next_due_periods(&self, as_of: NaiveDate) -> Vec<&PayPeriod> {
        let mut due: Vec<&PayPeriod> = self
            .periods
            .values()
            .filter(|p| p.status == PeriodStatus::Scheduled && p.start_date <= as_of)
            .collect();
        due.sort_by_key(|p| p.start_date);
        due
    }

    /// Look up a period.
    pub fn get(&self, id: PeriodId) -> Option<&PayPeriod> {
        self.periods.get(&id)
    }

    /// Look up a period for mutation.
    pub fn get_mut(&mut self, id: PeriodId) -> Result<&mut PayPeriod, PayrollError> {
        self.periods
            .get_mut(&id)
            .ok_or(PayrollError::PeriodNotFound { id })
    }

    /// All periods, ordered by start date.
    pub fn list(&self) -> Vec<&PayPeriod> {
        let mut all: Vec<&PayPeriod> = self.periods.values().collect();
        all.sort_by_key(|p| p.start_date);
        all
    }

    /// Cancel a Scheduled period (manual override).
    pub fn cancel(&mut self, id: PeriodId) -> Result<(), PayrollError> {
        self.get_mut(id)?.transition(PeriodStatus::Cancelled)
    }
}
