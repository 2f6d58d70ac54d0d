//! # Rules Console
//!
//! Engine behind the email-rules admin console: loads rule records from
//! the rules backend, filters and sorts them in memory, and toggles a
//! rule's active flag with an optimistic update that rolls back on
//! failure. Rendering is left to whatever surface embeds the controller.

pub mod api;
pub mod config;
pub mod rules;

pub use api::{RuleBackend, RulesApiClient, RulesApiError, SaveRuleRequest};
pub use config::AppConfig;
pub use rules::{
    ActionKind, ControllerError, EmailRule, RuleFilter, RuleListController, SortKey,
    StatusControl, StatusSelection,
};
