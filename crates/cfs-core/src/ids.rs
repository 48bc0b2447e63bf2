//! # Entity Identifiers
//!
//! Newtype wrappers over [`Uuid`] for every entity in the stack. Each id
//! type is a distinct type, so a `RunId` can never be passed where a
//! `PeriodId` is expected — the mixups are unrepresentable.
//!
//! All ids serialize transparently as their inner UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

entity_id! {
    /// Identifier for an effective-dated tax rule version.
    TaxRuleId
}

entity_id! {
    /// Identifier for a pay period.
    PeriodId
}

entity_id! {
    /// Identifier for a payroll run.
    RunId
}

entity_id! {
    /// Identifier for an employee (owned by the external employee
    /// management system; carried here as an opaque reference).
    EmployeeId
}

entity_id! {
    /// Identifier for a ledger transaction.
    TransactionId
}

entity_id! {
    /// Identifier for an invoice.
    InvoiceId
}

entity_id! {
    /// Identifier for a budget allocation.
    BudgetId
}
