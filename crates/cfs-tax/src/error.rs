//! Error types for the tax registry and policy resolver.

use cfs_core::{MoneyError, TaxRuleId};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by tax rule management and salary policy resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxError {
    /// A new rule's effective range overlaps an existing active range
    /// for the same tax name.
    #[error("tax rule {name:?} effective from {effective_from} overlaps an existing active range")]
    OverlappingRule {
        /// The tax name with the conflicting range.
        name: String,
        /// The requested effective-from date.
        effective_from: NaiveDate,
    },

    /// No rule exists with the given id.
    #[error("tax rule {id} not found")]
    RuleNotFound {
        /// The missing rule id.
        id: TaxRuleId,
    },

    /// The rule is referenced by a finalized payroll run and cannot be
    /// removed.
    #[error("tax rule {id} is referenced by a finalized payroll run")]
    RuleInUse {
        /// The referenced rule id.
        id: TaxRuleId,
    },

    /// No salary policy matches the employee's role.
    #[error("no salary policy for role {role:?}")]
    PolicyNotFound {
        /// The role with no matching policy.
        role: String,
    },

    /// Amount or rate arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}
