//! Rule list controller
//!
//! Owns the in-memory projection of the loaded rule set and runs the
//! dashboard logic over it: filtering, stable sorting, and optimistic
//! status toggling with rollback against the remote backend.
//!
//! The projection is mutated locally only for the active flag. Creation,
//! editing and deletion go to the backend and are followed by a full
//! reload, never by incremental edits to the projection.

use super::filter::RuleFilter;
use super::sort::{sort_rules, SortKey};
use super::EmailRule;
use crate::api::{RuleBackend, RulesApiError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ============================================================================
// Status Control State Machine
// ============================================================================

/// Per-rule status control
///
/// `Toggling` holds the pre-toggle state so a failed remote call can
/// revert exactly; while toggling, the displayed state is the optimistic
/// flipped value. No state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusControl {
    Active,
    Inactive,
    Toggling { from: bool },
}

impl StatusControl {
    pub fn from_active(is_active: bool) -> Self {
        if is_active {
            StatusControl::Active
        } else {
            StatusControl::Inactive
        }
    }

    /// Displayed state; optimistic while a toggle is in flight
    pub fn is_active(&self) -> bool {
        match self {
            StatusControl::Active => true,
            StatusControl::Inactive => false,
            StatusControl::Toggling { from } => !from,
        }
    }

    pub fn is_toggling(&self) -> bool {
        matches!(self, StatusControl::Toggling { .. })
    }

    /// Enter `Toggling` and return the optimistic target state, or `None`
    /// if a toggle is already in flight for this rule
    pub fn begin_toggle(&mut self) -> Option<bool> {
        match *self {
            StatusControl::Toggling { .. } => None,
            StatusControl::Active => {
                *self = StatusControl::Toggling { from: true };
                Some(false)
            }
            StatusControl::Inactive => {
                *self = StatusControl::Toggling { from: false };
                Some(true)
            }
        }
    }

    /// Commit the authoritative server state, which may differ from the
    /// optimistic guess
    pub fn server_confirms(&mut self, is_active: bool) {
        *self = StatusControl::from_active(is_active);
    }

    /// Revert to the pre-toggle state
    pub fn server_fails(&mut self) {
        if let StatusControl::Toggling { from } = *self {
            *self = StatusControl::from_active(from);
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Rule not found in loaded set: {0}")]
    UnknownRule(String),

    #[error("Toggle already in flight for rule: {0}")]
    ToggleInFlight(String),

    #[error(transparent)]
    Api(#[from] RulesApiError),
}

/// Controller over the loaded rule set
///
/// All mutation happens through `&mut self`, so there is a single logical
/// thread of execution; the only suspension points are the backend calls
/// inside [`toggle_status`](Self::toggle_status) and
/// [`confirm_and_delete`](Self::confirm_and_delete).
pub struct RuleListController {
    backend: Arc<dyn RuleBackend>,
    /// Full loaded set, in current sort order
    rules: Vec<EmailRule>,
    /// Status state machine per rule id
    controls: HashMap<String, StatusControl>,
    filter: RuleFilter,
    sort_key: SortKey,
    /// Ids of rules passing the current filter, in display order
    visible: Vec<String>,
    /// Same ids as `visible`, for constant-time membership checks
    visible_set: HashSet<String>,
}

impl RuleListController {
    pub fn new(backend: Arc<dyn RuleBackend>) -> Self {
        Self {
            backend,
            rules: Vec::new(),
            controls: HashMap::new(),
            filter: RuleFilter::all(),
            sort_key: SortKey::default(),
            visible: Vec::new(),
            visible_set: HashSet::new(),
        }
    }

    /// Ingest a backend-provided rule list into the projection
    ///
    /// Duplicated rule ids are dropped after the first occurrence. The
    /// current sort key and filters are applied immediately.
    pub fn load(&mut self, rules: Vec<EmailRule>) {
        self.rules.clear();
        self.controls.clear();

        for rule in rules {
            if self.controls.contains_key(&rule.rule_id) {
                log::warn!("Dropping duplicate rule id in load: {}", rule.rule_id);
                continue;
            }
            self.controls
                .insert(rule.rule_id.clone(), StatusControl::from_active(rule.is_active));
            self.rules.push(rule);
        }

        sort_rules(&mut self.rules, self.sort_key);
        self.apply_filter();
        log::info!(
            "Loaded {} rules ({} visible under current filter)",
            self.rules.len(),
            self.visible.len()
        );
    }

    /// Fetch the full list from the backend and load it
    pub async fn refresh(&mut self) -> Result<usize, ControllerError> {
        let rules = self.backend.fetch_rules().await?;
        self.load(rules);
        Ok(self.rules.len())
    }

    /// Replace the filter state and return the new visible count
    pub fn set_filter(&mut self, filter: RuleFilter) -> usize {
        self.filter = filter;
        self.apply_filter();
        self.visible.len()
    }

    /// Re-sort the full set; visibility is reapplied afterward
    pub fn sort(&mut self, key: SortKey) {
        self.sort_key = key;
        sort_rules(&mut self.rules, key);
        self.apply_filter();
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn total_count(&self) -> usize {
        self.rules.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Visible rules in current display order
    pub fn visible_rules(&self) -> Vec<&EmailRule> {
        self.rules
            .iter()
            .filter(|r| self.visible_set.contains(&r.rule_id))
            .collect()
    }

    pub fn is_visible(&self, rule_id: &str) -> bool {
        self.visible_set.contains(rule_id)
    }

    pub fn rule(&self, rule_id: &str) -> Option<&EmailRule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Current state of a rule's status control
    pub fn status(&self, rule_id: &str) -> Option<StatusControl> {
        self.controls.get(rule_id).copied()
    }

    /// Flip a rule's active flag against the backend
    ///
    /// The local state flips immediately; on success the authoritative
    /// server value is committed, on any failure the pre-toggle state is
    /// restored. Composed from [`begin_toggle`](Self::begin_toggle) and
    /// [`complete_toggle`](Self::complete_toggle); an embedding surface
    /// that drives its own remote call uses the two phases directly.
    pub async fn toggle_status(&mut self, rule_id: &str) -> Result<bool, ControllerError> {
        self.begin_toggle(rule_id)?;
        let result = self.backend.toggle_rule(rule_id).await;
        self.complete_toggle(rule_id, result)
    }

    /// Enter the tentative phase: flip the displayed state and mark the
    /// control as toggling
    ///
    /// Returns the optimistic target state. A second begin for the same
    /// rule while one is outstanding is refused rather than queued;
    /// different rules are independent.
    pub fn begin_toggle(&mut self, rule_id: &str) -> Result<bool, ControllerError> {
        let control = self
            .controls
            .get_mut(rule_id)
            .ok_or_else(|| ControllerError::UnknownRule(rule_id.to_string()))?;
        let optimistic = control
            .begin_toggle()
            .ok_or_else(|| ControllerError::ToggleInFlight(rule_id.to_string()))?;

        self.set_active_flag(rule_id, optimistic);
        log::info!(
            "Optimistically toggled rule {} to {}",
            rule_id,
            if optimistic { "active" } else { "inactive" }
        );
        Ok(optimistic)
    }

    /// Resolve an outstanding toggle with the backend outcome
    ///
    /// On success the authoritative server state is committed (it may
    /// differ from the optimistic guess); on failure the pre-toggle state
    /// is restored and the error is passed back to the caller.
    pub fn complete_toggle(
        &mut self,
        rule_id: &str,
        result: Result<bool, RulesApiError>,
    ) -> Result<bool, ControllerError> {
        let control = self
            .controls
            .get_mut(rule_id)
            .ok_or_else(|| ControllerError::UnknownRule(rule_id.to_string()))?;

        match result {
            Ok(server_state) => {
                control.server_confirms(server_state);
                self.set_active_flag(rule_id, server_state);
                Ok(server_state)
            }
            Err(e) => {
                control.server_fails();
                let reverted = control.is_active();
                self.set_active_flag(rule_id, reverted);
                log::warn!("Toggle of rule {} failed, reverted: {}", rule_id, e);
                Err(e.into())
            }
        }
    }

    /// Delete a rule after an explicit confirmation step naming it
    ///
    /// Returns `Ok(false)` when the confirmation is declined. On success
    /// the projection is left untouched; the caller performs a full
    /// [`refresh`](Self::refresh).
    pub async fn confirm_and_delete<F>(
        &mut self,
        rule_id: &str,
        confirm: F,
    ) -> Result<bool, ControllerError>
    where
        F: FnOnce(&str) -> bool,
    {
        let name = self
            .rule(rule_id)
            .map(|r| r.name.clone())
            .ok_or_else(|| ControllerError::UnknownRule(rule_id.to_string()))?;

        if !confirm(&name) {
            log::info!("Delete of rule {} ({}) declined", rule_id, name);
            return Ok(false);
        }

        self.backend.delete_rule(rule_id).await?;
        Ok(true)
    }

    /// Drop the loaded set entirely
    pub fn dispose(&mut self) {
        self.rules.clear();
        self.controls.clear();
        self.visible.clear();
        self.visible_set.clear();
    }

    fn apply_filter(&mut self) {
        self.visible = self
            .rules
            .iter()
            .filter(|r| self.filter.matches(r))
            .map(|r| r.rule_id.clone())
            .collect();
        self.visible_set = self.visible.iter().cloned().collect();
    }

    fn set_active_flag(&mut self, rule_id: &str, is_active: bool) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.rule_id == rule_id) {
            rule.is_active = is_active;
        }
        // Derived counts must track every state change
        self.apply_filter();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SaveRuleRequest;
    use crate::rules::filter::StatusSelection;
    use crate::rules::ActionKind;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Status control state machine
    // ------------------------------------------------------------------

    #[test]
    fn test_begin_toggle_from_active() {
        let mut control = StatusControl::Active;
        assert_eq!(control.begin_toggle(), Some(false));
        assert_eq!(control, StatusControl::Toggling { from: true });
        assert!(!control.is_active()); // optimistic
    }

    #[test]
    fn test_begin_toggle_refused_while_in_flight() {
        let mut control = StatusControl::Inactive;
        assert_eq!(control.begin_toggle(), Some(true));
        assert_eq!(control.begin_toggle(), None);
    }

    #[test]
    fn test_server_confirms_may_differ_from_guess() {
        let mut control = StatusControl::Active;
        control.begin_toggle();
        // Server says it stayed active
        control.server_confirms(true);
        assert_eq!(control, StatusControl::Active);
    }

    #[test]
    fn test_server_fails_reverts_to_pre_toggle_state() {
        let mut control = StatusControl::Inactive;
        control.begin_toggle();
        control.server_fails();
        assert_eq!(control, StatusControl::Inactive);

        let mut control = StatusControl::Active;
        control.begin_toggle();
        control.server_fails();
        assert_eq!(control, StatusControl::Active);
    }

    #[test]
    fn test_control_is_reusable_after_failure() {
        let mut control = StatusControl::Active;
        for _ in 0..3 {
            assert!(control.begin_toggle().is_some());
            control.server_fails();
            assert_eq!(control, StatusControl::Active);
        }
        control.begin_toggle();
        control.server_confirms(false);
        assert_eq!(control, StatusControl::Inactive);
    }

    // ------------------------------------------------------------------
    // Controller against a scripted backend
    // ------------------------------------------------------------------

    /// Scripted backend: configurable toggle outcome, records deletes
    struct StubBackend {
        rules: Vec<EmailRule>,
        toggle_result: Mutex<Result<bool, String>>,
        deleted: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new(rules: Vec<EmailRule>) -> Self {
            Self {
                rules,
                toggle_result: Mutex::new(Ok(true)),
                deleted: Mutex::new(Vec::new()),
            }
        }

        fn set_toggle_result(&self, result: Result<bool, &str>) {
            *self.toggle_result.lock().unwrap() = result.map_err(str::to_string);
        }
    }

    #[async_trait]
    impl RuleBackend for StubBackend {
        async fn fetch_rules(&self) -> Result<Vec<EmailRule>, RulesApiError> {
            Ok(self.rules.clone())
        }

        async fn get_rule(&self, rule_id: &str) -> Result<EmailRule, RulesApiError> {
            self.rules
                .iter()
                .find(|r| r.rule_id == rule_id)
                .cloned()
                .ok_or_else(|| RulesApiError::RuleNotFound(rule_id.to_string()))
        }

        async fn toggle_rule(&self, _rule_id: &str) -> Result<bool, RulesApiError> {
            self.toggle_result
                .lock()
                .unwrap()
                .clone()
                .map_err(RulesApiError::ServerError)
        }

        async fn delete_rule(&self, rule_id: &str) -> Result<(), RulesApiError> {
            self.deleted.lock().unwrap().push(rule_id.to_string());
            Ok(())
        }

        async fn save_rule(&self, _req: &SaveRuleRequest) -> Result<EmailRule, RulesApiError> {
            Err(RulesApiError::InvalidResponse)
        }
    }

    fn rule(id: &str, name: &str, action: ActionKind, active: bool, ts: i64) -> EmailRule {
        EmailRule {
            rule_id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            query: String::new(),
            action,
            is_active: active,
            max_results: 10,
            count_processed: 0,
            created_date: Some(Utc.timestamp_opt(ts, 0).unwrap()),
            modified_date: Some(Utc.timestamp_opt(ts, 0).unwrap()),
            data: serde_json::Value::Null,
        }
    }

    /// The two-rule set from the dashboard scenarios: Alpha (sms, active)
    /// and Beta (archive, inactive)
    fn alpha_beta() -> Vec<EmailRule> {
        vec![
            rule("1", "Alpha", ActionKind::Sms, true, 2_000),
            rule("2", "Beta", ActionKind::Archive, false, 1_000),
        ]
    }

    fn controller_with(rules: Vec<EmailRule>) -> (RuleListController, Arc<StubBackend>) {
        let backend = Arc::new(StubBackend::new(rules.clone()));
        let mut controller = RuleListController::new(backend.clone());
        controller.load(rules);
        (controller, backend)
    }

    #[test]
    fn test_load_applies_default_modified_sort() {
        let (controller, _) = controller_with(alpha_beta());
        assert_eq!(controller.sort_key(), SortKey::Modified);
        let visible: Vec<_> = controller.visible_rules();
        // Alpha modified later, so it leads
        assert_eq!(visible[0].rule_id, "1");
        assert_eq!(visible[1].rule_id, "2");
    }

    #[test]
    fn test_empty_filter_count_equals_total() {
        let (mut controller, _) = controller_with(alpha_beta());
        let count = controller.set_filter(RuleFilter::all());
        assert_eq!(count, controller.total_count());
    }

    #[test]
    fn test_active_only_filter_hides_beta() {
        let (mut controller, _) = controller_with(alpha_beta());
        let count = controller.set_filter(RuleFilter {
            statuses: StatusSelection::only_active(),
            ..RuleFilter::all()
        });
        assert_eq!(count, 1);
        assert!(controller.is_visible("1"));
        assert!(!controller.is_visible("2"));
    }

    #[test]
    fn test_search_alpha_matches_one_rule() {
        let (mut controller, _) = controller_with(alpha_beta());
        let count = controller.set_filter(RuleFilter::with_search("alpha"));
        assert_eq!(count, 1);
        assert!(controller.is_visible("1"));
    }

    #[test]
    fn test_action_sort_orders_beta_before_alpha() {
        let (mut controller, _) = controller_with(alpha_beta());
        controller.sort(SortKey::Action);
        let visible = controller.visible_rules();
        assert_eq!(visible[0].rule_id, "2"); // archive
        assert_eq!(visible[1].rule_id, "1"); // sms
    }

    #[test]
    fn test_sort_does_not_change_visibility() {
        let (mut controller, _) = controller_with(alpha_beta());
        controller.set_filter(RuleFilter {
            statuses: StatusSelection::only_active(),
            ..RuleFilter::all()
        });
        controller.sort(SortKey::Name);
        assert_eq!(controller.visible_count(), 1);
        assert!(controller.is_visible("1"));
    }

    #[tokio::test]
    async fn test_toggle_commits_authoritative_server_state() {
        let (mut controller, backend) = controller_with(alpha_beta());
        backend.set_toggle_result(Ok(true));

        let new_state = controller.toggle_status("2").await.unwrap();
        assert!(new_state);
        assert!(controller.rule("2").unwrap().is_active);
        assert_eq!(controller.status("2"), Some(StatusControl::Active));
    }

    #[tokio::test]
    async fn test_toggle_failure_rolls_back_and_keeps_filter() {
        let (mut controller, backend) = controller_with(alpha_beta());
        controller.set_filter(RuleFilter {
            statuses: StatusSelection::only_active(),
            ..RuleFilter::all()
        });
        assert_eq!(controller.visible_count(), 1);

        backend.set_toggle_result(Err("boom"));
        let err = controller.toggle_status("2").await.unwrap_err();
        assert!(matches!(err, ControllerError::Api(_)));

        // Beta is back to inactive and the visible set is unchanged
        assert!(!controller.rule("2").unwrap().is_active);
        assert_eq!(controller.status("2"), Some(StatusControl::Inactive));
        assert_eq!(controller.visible_count(), 1);
        assert!(controller.is_visible("1"));
        assert!(!controller.is_visible("2"));
    }

    #[tokio::test]
    async fn test_toggle_success_updates_visible_count() {
        let (mut controller, backend) = controller_with(alpha_beta());
        controller.set_filter(RuleFilter {
            statuses: StatusSelection::only_active(),
            ..RuleFilter::all()
        });

        backend.set_toggle_result(Ok(true));
        controller.toggle_status("2").await.unwrap();
        assert_eq!(controller.visible_count(), 2);
    }

    #[test]
    fn test_second_begin_for_same_rule_is_refused() {
        let (mut controller, _) = controller_with(alpha_beta());

        let optimistic = controller.begin_toggle("1").unwrap();
        assert!(!optimistic);
        assert!(controller.status("1").unwrap().is_toggling());

        let err = controller.begin_toggle("1").unwrap_err();
        assert!(matches!(err, ControllerError::ToggleInFlight(_)));
        // Different rules stay independent
        assert!(controller.begin_toggle("2").is_ok());
    }

    #[test]
    fn test_two_phase_toggle_commits_and_reverts() {
        let (mut controller, _) = controller_with(alpha_beta());

        controller.begin_toggle("1").unwrap();
        assert!(!controller.rule("1").unwrap().is_active);
        let state = controller.complete_toggle("1", Ok(false)).unwrap();
        assert!(!state);
        assert_eq!(controller.status("1"), Some(StatusControl::Inactive));

        controller.begin_toggle("2").unwrap();
        assert!(controller.rule("2").unwrap().is_active);
        let err = controller
            .complete_toggle("2", Err(RulesApiError::ServerError("down".to_string())))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Api(_)));
        assert!(!controller.rule("2").unwrap().is_active);
        // Control is idle again and reusable
        assert!(controller.begin_toggle("2").is_ok());
    }

    #[test]
    fn test_visible_membership_tracks_order_after_resort() {
        let (mut controller, _) = controller_with(alpha_beta());
        controller.set_filter(RuleFilter {
            statuses: StatusSelection::only_inactive(),
            ..RuleFilter::all()
        });
        controller.sort(SortKey::Name);

        assert_eq!(controller.visible_count(), 1);
        assert!(controller.is_visible("2"));
        assert!(!controller.is_visible("1"));
        let visible = controller.visible_rules();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].rule_id, "2");
    }

    #[tokio::test]
    async fn test_toggle_unknown_rule_is_an_error() {
        let (mut controller, _) = controller_with(alpha_beta());
        let err = controller.toggle_status("missing").await.unwrap_err();
        assert!(matches!(err, ControllerError::UnknownRule(_)));
    }

    #[tokio::test]
    async fn test_projection_usable_after_repeated_failures() {
        let (mut controller, backend) = controller_with(alpha_beta());
        backend.set_toggle_result(Err("down"));

        for _ in 0..3 {
            assert!(controller.toggle_status("1").await.is_err());
            assert!(controller.rule("1").unwrap().is_active);
        }

        backend.set_toggle_result(Ok(false));
        let state = controller.toggle_status("1").await.unwrap();
        assert!(!state);
    }

    #[tokio::test]
    async fn test_confirm_and_delete_passes_rule_name() {
        let (mut controller, backend) = controller_with(alpha_beta());

        let mut seen_name = String::new();
        let deleted = controller
            .confirm_and_delete("2", |name| {
                seen_name = name.to_string();
                true
            })
            .await
            .unwrap();

        assert!(deleted);
        assert_eq!(seen_name, "Beta");
        assert_eq!(*backend.deleted.lock().unwrap(), vec!["2".to_string()]);
        // Projection untouched until the caller reloads
        assert_eq!(controller.total_count(), 2);
    }

    #[tokio::test]
    async fn test_declined_confirmation_skips_backend() {
        let (mut controller, backend) = controller_with(alpha_beta());
        let deleted = controller.confirm_and_delete("1", |_| false).await.unwrap();
        assert!(!deleted);
        assert!(backend.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_reloads_from_backend() {
        let backend = Arc::new(StubBackend::new(alpha_beta()));
        let mut controller = RuleListController::new(backend);
        let total = controller.refresh().await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(controller.visible_count(), 2);
    }

    #[test]
    fn test_duplicate_rule_ids_dropped_on_load() {
        let mut rules = alpha_beta();
        rules.push(rule("1", "Alpha copy", ActionKind::Sms, true, 3_000));
        let (controller, _) = controller_with_raw(rules);
        assert_eq!(controller.total_count(), 2);
        assert_eq!(controller.rule("1").unwrap().name, "Alpha");
    }

    fn controller_with_raw(rules: Vec<EmailRule>) -> (RuleListController, Arc<StubBackend>) {
        let backend = Arc::new(StubBackend::new(Vec::new()));
        let mut controller = RuleListController::new(backend.clone());
        controller.load(rules);
        (controller, backend)
    }

    #[test]
    fn test_dispose_empties_projection() {
        let (mut controller, _) = controller_with(alpha_beta());
        controller.dispose();
        assert_eq!(controller.total_count(), 0);
        assert_eq!(controller.visible_count(), 0);
        assert!(controller.status("1").is_none());
    }
}
