//! Display derivations for the rules dashboard
//!
//! Pure functions only; nothing here touches the projection or the
//! backend, so the decision logic stays testable without a rendering
//! surface.

use super::ActionKind;
use chrono::{DateTime, Utc};

const PREVIEW_MAX_CHARS: usize = 60;

/// Badge style class for an action kind
pub fn badge_class(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Sms => "bg-success",
        ActionKind::BankSync => "bg-info",
        ActionKind::Archive => "bg-warning",
        ActionKind::EmailForward => "bg-primary",
        ActionKind::Webhook => "bg-secondary",
        ActionKind::MarkRead | ActionKind::Unknown => "bg-dark",
    }
}

/// Full action name shown in detail views and the action selector
pub fn display_name(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Sms => "SMS Alert",
        ActionKind::BankSync => "Bank Sync",
        ActionKind::Archive => "Archive",
        ActionKind::EmailForward => "Email Forward",
        ActionKind::Webhook => "Webhook",
        ActionKind::MarkRead => "Mark as Read",
        ActionKind::Unknown => "Unknown",
    }
}

/// Compact label for list rows
pub fn short_label(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Sms => "SMS",
        ActionKind::BankSync => "Bank",
        ActionKind::Archive => "Archive",
        ActionKind::EmailForward => "Email",
        ActionKind::Webhook => "Webhook",
        ActionKind::MarkRead => "Read",
        ActionKind::Unknown => "Other",
    }
}

/// Absolute timestamp in the dashboard's fixed format
pub fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Unknown".to_string(),
    }
}

/// Relative age relative to `now` ("3d ago", "2h ago", "5m ago")
pub fn relative_date(value: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(dt) = value else {
        return "Unknown".to_string();
    };

    let elapsed = now.signed_duration_since(dt);
    if elapsed.num_days() > 0 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m ago", elapsed.num_minutes())
    } else {
        "Just now".to_string()
    }
}

/// Description preview for compact list rows, capped at 60 characters
pub fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{}...", truncated)
    }
}
