//! Rule visibility predicates
//!
//! A rule is visible iff it passes the search term, the action multi-select
//! and the status multi-select. Each predicate is evaluated per rule with
//! no ordering dependency, and filtering never reorders the projection.

use super::{ActionKind, EmailRule};
use std::collections::HashSet;

/// Active/inactive checkbox pair
///
/// These are explicit multi-select semantics: a deselected status excludes
/// its rules, so deselecting both hides everything rather than showing all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSelection {
    pub active: bool,
    pub inactive: bool,
}

impl StatusSelection {
    pub fn both() -> Self {
        Self { active: true, inactive: true }
    }

    pub fn only_active() -> Self {
        Self { active: true, inactive: false }
    }

    pub fn only_inactive() -> Self {
        Self { active: false, inactive: true }
    }

    pub fn none() -> Self {
        Self { active: false, inactive: false }
    }

    fn admits(&self, is_active: bool) -> bool {
        if is_active {
            self.active
        } else {
            self.inactive
        }
    }
}

impl Default for StatusSelection {
    fn default() -> Self {
        Self::both()
    }
}

/// Filter state of the rules dashboard
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    /// Free-text search, matched case-insensitively against name,
    /// description and query
    pub search: String,
    /// Action kinds to include; empty means no restriction
    pub actions: HashSet<ActionKind>,
    pub statuses: StatusSelection,
}

impl RuleFilter {
    /// No search term, all actions, both statuses
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_search(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    /// Test a single rule against every active predicate
    pub fn matches(&self, rule: &EmailRule) -> bool {
        self.matches_search(rule) && self.matches_action(rule) && self.matches_status(rule)
    }

    fn matches_search(&self, rule: &EmailRule) -> bool {
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        rule.name.to_lowercase().contains(&term)
            || rule.description.to_lowercase().contains(&term)
            || rule.query.to_lowercase().contains(&term)
    }

    fn matches_action(&self, rule: &EmailRule) -> bool {
        self.actions.is_empty() || self.actions.contains(&rule.action)
    }

    fn matches_status(&self, rule: &EmailRule) -> bool {
        self.statuses.admits(rule.is_active)
    }
}
