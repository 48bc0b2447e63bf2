//! # Tax Rule Registry
//!
//! Named tax rates with effective-dated validity ranges. The registry is
//! append-only in spirit: a rate change closes the open range for a name
//! and adds a new rule; rules referenced by a finalized payroll run can
//! never be deleted.
//!
//! ## Invariant
//!
//! For any tax name and any date, at most one rule is active. Enforced
//! on insertion ([`TaxError::OverlappingRule`]), relied on by
//! [`TaxRegistry::snapshot_at`].
//!
//! A rule's range is half-open: active for `effective_from <= d` and,
//! when `effective_to` is set, `d < effective_to`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cfs_core::TaxRuleId;

use crate::error::TaxError;

/// One effective-dated version of a named tax rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRule {
    /// Unique id of this rule version.
    pub id: TaxRuleId,
    /// Tax name, e.g. `"Income"`. Several rule versions may share a
    /// name as long as their ranges do not overlap.
    pub name: String,
    /// Rate in basis points (1/10000).
    pub rate_bps: i64,
    /// First date (inclusive) this rate applies.
    pub effective_from: NaiveDate,
    /// First date (exclusive) this rate no longer applies. `None` means
    /// open-ended.
    pub effective_to: Option<NaiveDate>,
}

impl TaxRule {
    /// Whether this rule is active on the given date.
    pub fn active_at(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.map_or(true, |to| date < to)
    }
}

/// A rate pinned inside a [`TaxSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRate {
    /// The rule version this rate came from.
    pub rule_id: TaxRuleId,
    /// Rate in basis points.
    pub rate_bps: i64,
}

/// The set of rates active at one pinned date.
///
/// A payroll run takes exactly one snapshot (at the period's payday) and
/// computes every slip from it, so concurrent registry edits can never
/// produce mixed rates within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSnapshot {
    /// The date the snapshot was pinned at.
    pub as_of: NaiveDate,
    rates: BTreeMap<String, SnapshotRate>,
}

impl TaxSnapshot {
    /// Iterate the pinned rates in tax-name order.
    pub fn rates(&self) -> impl Iterator<Item = (&str, &SnapshotRate)> {
        self.rates.iter().map(|(name, rate)| (name.as_str(), rate))
    }

    /// The rule ids this snapshot pins.
    pub fn rule_ids(&self) -> Vec<TaxRuleId> {
        self.rates.values().map(|r| r.rule_id).collect()
    }

    /// Number of active rates in the snapshot.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the snapshot has no active rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Registry of effective-dated tax rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxRegistry {
    rules: BTreeMap<TaxRuleId, TaxRule>,
    /// Rule ids referenced by a finalized (disbursed) payroll run.
    /// These can never be deleted.
    referenced: BTreeSet<TaxRuleId>,
}

impl TaxRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new open-ended rule for `name` starting at `effective_from`.
    ///
    /// Fails with [`TaxError::OverlappingRule`] if any existing rule for
    /// the same name is still active on or after `effective_from`.
    pub fn add_rule(
        &mut self,
        name: impl Into<String>,
        rate_bps: i64,
        effective_from: NaiveDate,
    ) -> Result<TaxRuleId, TaxError> {
        let name = name.into();
        // The new rule is open-ended, so it collides with any same-name
        // rule whose range extends past effective_from.
        let overlaps = self.rules.values().any(|rule| {
            rule.name == name && rule.effective_to.map_or(true, |to| to > effective_from)
        });
        if overlaps {
            return Err(TaxError::OverlappingRule {
                name,
                effective_from,
            });
        }
        let id = TaxRuleId::new();
        self.rules.insert(
            id,
            TaxRule {
                id,
                name,
                rate_bps,
                effective_from,
                effective_to: None,
            },
        );
        Ok(id)
    }

    /// Change the rate for `name` from `effective_from` onward.
    ///
    /// Implemented as close-old + add-new: the currently open rule (if
    /// any) gets `effective_to = effective_from`, and a fresh open-ended
    /// rule is added. Rates already pinned by historical snapshots are
    /// untouched.
    pub fn update_rate(
        &mut self,
        name: &str,
        rate_bps: i64,
        effective_from: NaiveDate,
    ) -> Result<TaxRuleId, TaxError> {
        let open = self
            .rules
            .values()
            .find(|r| r.name == name && r.effective_to.is_none())
            .map(|r| (r.id, r.effective_from));
        if let Some((open_id, open_from)) = open {
            if effective_from <= open_from {
                // Closing the open rule at or before its own start would
                // rewrite history it may already cover.
                return Err(TaxError::OverlappingRule {
                    name: name.to_string(),
                    effective_from,
                });
            }
            if let Some(rule) = self.rules.get_mut(&open_id) {
                rule.effective_to = Some(effective_from);
            }
        }
        self.add_rule(name, rate_bps, effective_from)
    }

    /// Remove a rule by id.
    ///
    /// Fails with [`TaxError::RuleInUse`] if a finalized payroll run
    /// references it.
    pub fn delete_rule(&mut self, id: TaxRuleId) -> Result<TaxRule, TaxError> {
        if self.referenced.contains(&id) {
            return Err(TaxError::RuleInUse { id });
        }
        self.rules
            .remove(&id)
            .ok_or(TaxError::RuleNotFound { id })
    }

    /// Mark rules as referenced by a finalized payroll run, freezing
    /// them against deletion. Called by the run engine at disbursement.
    pub fn mark_referenced(&mut self, ids: impl IntoIterator<Item = TaxRuleId>) {
        self.referenced.extend(ids);
    }

    /// Whether a finalized run references this rule.
    pub fn is_referenced(&self, id: TaxRuleId) -> bool {
        self.referenced.contains(&id)
    }

    /// Pin the set of rates active on `as_of`.
    pub fn snapshot_at(&self, as_of: NaiveDate) -> TaxSnapshot {
        let rates = self
            .rules
            .values()
            .filter(|rule| rule.active_at(as_of))
            .map(|rule| {
                (
                    rule.name.clone(),
                    SnapshotRate {
                        rule_id: rule.id,
                        rate_bps: rule.rate_bps,
                    },
                )
            })
            .collect();
        TaxSnapshot { as_of, rates }
    }

    /// Look up a rule by id.
    pub fn get(&self, id: TaxRuleId) -> Option<&TaxRule> {
        self.rules.get(&id)
    }

    /// List all rule versions, sorted by name then effective-from.
    pub fn list_rules(&self) -> Vec<&TaxRule> {
        let mut rules: Vec<&TaxRule> = self.rules.values().collect();
        rules.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.effective_from.cmp(&b.effective_from))
        });
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn add_rule_then_snapshot_sees_it() {
        let mut registry = TaxRegistry::new();
        registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();

        let snap = registry.snapshot_at(date(2024, 6, 15));
        assert_eq!(snap.len(), 1);
        let (name, rate) = snap.rates().next().unwrap();
        assert_eq!(name, "Income");
        assert_eq!(rate.rate_bps, 1000);
    }

    #[test]
    fn snapshot_before_effective_from_is_empty() {
        let mut registry = TaxRegistry::new();
        registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();
        assert!(registry.snapshot_at(date(2023, 12, 31)).is_empty());
    }

    #[test]
    fn overlapping_add_is_rejected() {
        let mut registry = TaxRegistry::new();
        registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();

        let err = registry
            .add_rule("Income", 1500, date(2024, 6, 1))
            .unwrap_err();
        assert!(matches!(err, TaxError::OverlappingRule { .. }));

        // Different name is fine.
        registry
            .add_rule("Pension", 500, date(2024, 1, 1))
            .unwrap();
    }

    #[test]
    fn update_rate_closes_old_and_opens_new() {
        let mut registry = TaxRegistry::new();
        let old_id = registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();
        let new_id = registry
            .update_rate("Income", 1500, date(2024, 7, 1))
            .unwrap();
        assert_ne!(old_id, new_id);

        // Before the change: old rate. After: new rate.
        let before = registry.snapshot_at(date(2024, 6, 30));
        assert_eq!(before.rates().next().unwrap().1.rate_bps, 1000);
        let after = registry.snapshot_at(date(2024, 7, 1));
        assert_eq!(after.rates().next().unwrap().1.rate_bps, 1500);
    }

    #[test]
    fn update_rate_cannot_rewrite_history() {
        let mut registry = TaxRegistry::new();
        registry.add_rule("Income", 1000, date(2024, 6, 1)).unwrap();
        let err = registry
            .update_rate("Income", 1500, date(2024, 6, 1))
            .unwrap_err();
        assert!(matches!(err, TaxError::OverlappingRule { .. }));
    }

    #[test]
    fn historical_snapshot_survives_later_edits() {
        let mut registry = TaxRegistry::new();
        registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();
        let pinned = registry.snapshot_at(date(2024, 3, 15));

        registry
            .update_rate("Income", 2000, date(2024, 4, 1))
            .unwrap();

        // Re-pinning the same date yields the same rates.
        let repinned = registry.snapshot_at(date(2024, 3, 15));
        assert_eq!(pinned, repinned);
    }

    #[test]
    fn delete_unreferenced_rule_succeeds() {
        let mut registry = TaxRegistry::new();
        let id = registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();
        let removed = registry.delete_rule(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(registry.snapshot_at(date(2024, 6, 1)).is_empty());
    }

    #[test]
    fn delete_referenced_rule_fails() {
        let mut registry = TaxRegistry::new();
        let id = registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();
        registry.mark_referenced([id]);

        let err = registry.delete_rule(id).unwrap_err();
        assert!(matches!(err, TaxError::RuleInUse { .. }));
        assert!(registry.get(id).is_some());
    }

    #[test]
    fn delete_missing_rule_is_not_found() {
        let mut registry = TaxRegistry::new();
        let err = registry.delete_rule(TaxRuleId::new()).unwrap_err();
        assert!(matches!(err, TaxError::RuleNotFound { .. }));
    }

    #[test]
    fn list_rules_sorted_by_name_then_date() {
        let mut registry = TaxRegistry::new();
        registry.add_rule("Pension", 500, date(2024, 1, 1)).unwrap();
        registry.add_rule("Income", 1000, date(2024, 1, 1)).unwrap();
        registry
            .update_rate("Income", 1200, date(2024, 7, 1))
            .unwrap();

        let names: Vec<(String, NaiveDate)> = registry
            .list_rules()
            .iter()
            .map(|r| (r.name.clone(), r.effective_from))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Income".to_string(), date(2024, 1, 1)),
                ("Income".to_string(), date(2024, 7, 1)),
                ("Pension".to_string(), date(2024, 1, 1)),
            ]
        );
    }
}
