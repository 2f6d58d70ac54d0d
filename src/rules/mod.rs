//! Email rule projection
//!
//! Read-only records loaded from the rules backend, plus the filter, sort
//! and toggle logic the dashboard runs over them.

pub mod controller;
pub mod display;
pub mod filter;
pub mod sort;


pub use controller::{ControllerError, RuleListController, StatusControl};
pub use filter::{RuleFilter, StatusSelection};
pub use sort::SortKey;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Email processing rule as served by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRule {
    pub rule_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub query: String,
    pub action: ActionKind,
    /// Rules without the field are treated as active
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub count_processed: u64,
    #[serde(default, deserialize_with = "deserialize_store_date")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_store_date")]
    pub modified_date: Option<DateTime<Utc>>,
    /// Per-action configuration blob, rendered by the detail view only
    #[serde(default)]
    pub data: serde_json::Value,
}

fn default_active() -> bool {
    true
}

fn default_max_results() -> u32 {
    10
}

/// Action a rule triggers on matching emails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Sms,
    BankSync,
    Archive,
    EmailForward,
    Webhook,
    MarkRead,
    /// Anything the console does not recognize; kept loadable so one bad
    /// record never blocks the whole list
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Sms => "sms",
            ActionKind::BankSync => "bank-sync",
            ActionKind::Archive => "archive",
            ActionKind::EmailForward => "email-forward",
            ActionKind::Webhook => "webhook",
            ActionKind::MarkRead => "mark-read",
            ActionKind::Unknown => "unknown",
        }
    }

    /// All concrete kinds, in dashboard order
    pub fn all() -> [ActionKind; 6] {
        [
            ActionKind::Sms,
            ActionKind::BankSync,
            ActionKind::Archive,
            ActionKind::EmailForward,
            ActionKind::Webhook,
            ActionKind::MarkRead,
        ]
    }
}

/// Timestamps arrive either as RFC 3339 strings or in MongoDB extended
/// JSON (`{"$date": "..."}` or `{"$date": {"$numberLong": "<millis>"}}`),
/// since the backend serves documents straight out of the store.
fn deserialize_store_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Plain(String),
        Extended {
            #[serde(rename = "$date")]
            date: Inner,
        },
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Inner {
        Iso(String),
        Long {
            #[serde(rename = "$numberLong")]
            millis: String,
        },
    }

    let parse_iso = |s: &str| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    };

    Ok(match Option::<Wire>::deserialize(deserializer)? {
        Some(Wire::Plain(s)) => parse_iso(&s),
        Some(Wire::Extended { date: Inner::Iso(s) }) => parse_iso(&s),
        Some(Wire::Extended { date: Inner::Long { millis } }) => millis
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        None => None,
    })
}
