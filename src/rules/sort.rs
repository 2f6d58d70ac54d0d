//! Sort order for the rules dashboard
//!
//! Name and action sort ascending on the lower-cased value; the two
//! timestamp keys sort newest first with missing dates treated as oldest.
//! All sorts are stable so equal keys keep their prior relative order.

use super::EmailRule;
use std::cmp::Ordering;

/// Sort key selectable in the dashboard toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Name,
    Action,
    Created,
    /// Default on load: last modified, newest first
    #[default]
    Modified,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Action => "action",
            SortKey::Created => "created",
            SortKey::Modified => "modified",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "action" => Ok(SortKey::Action),
            "created" => Ok(SortKey::Created),
            "modified" => Ok(SortKey::Modified),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }

    /// Compare two rules under this key
    pub fn compare(&self, a: &EmailRule, b: &EmailRule) -> Ordering {
        match self {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Action => a.action.as_str().cmp(b.action.as_str()),
            // Newest first; None is ordered before any Some, so missing
            // timestamps land at the end of a descending sort
            SortKey::Created => b.created_date.cmp(&a.created_date),
            SortKey::Modified => b.modified_date.cmp(&a.modified_date),
        }
    }
}

/// Stable in-place sort of the projection
pub fn sort_rules(rules: &mut [EmailRule], key: SortKey) {
    rules.sort_by(|a, b| key.compare(a, b));
}
