//! Rules API client - HTTP communication with the rules backend
//!
//! Wraps the REST endpoints the admin console consumes:
//! - Full rule list
//! - Single rule lookup
//! - Status toggle
//! - Delete
//! - Create/update

use crate::rules::{ActionKind, EmailRule};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Remote operations the rule list controller depends on
///
/// The controller only ever talks to the backend through this trait, so
/// tests can substitute a scripted implementation.
#[async_trait]
pub trait RuleBackend: Send + Sync {
    /// Fetch the full rule list
    async fn fetch_rules(&self) -> Result<Vec<EmailRule>, RulesApiError>;

    /// Fetch one rule by id
    async fn get_rule(&self, rule_id: &str) -> Result<EmailRule, RulesApiError>;

    /// Flip a rule's active flag; returns the authoritative new state
    async fn toggle_rule(&self, rule_id: &str) -> Result<bool, RulesApiError>;

    /// Remove a rule; the caller reloads the full list afterward
    async fn delete_rule(&self, rule_id: &str) -> Result<(), RulesApiError>;

    /// Create (no `rule_id`) or update (with `rule_id`) a rule
    async fn save_rule(&self, req: &SaveRuleRequest) -> Result<EmailRule, RulesApiError>;
}

/// API client for the rules backend
pub struct RulesApiClient {
    client: Client,
    base_url: String,
}

impl RulesApiClient {
    /// Create a client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, RulesApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RulesApiError> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| RulesApiError::InvalidBaseUrl(e.to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RulesApiError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RuleBackend for RulesApiClient {
    async fn fetch_rules(&self) -> Result<Vec<EmailRule>, RulesApiError> {
        let response = self
            .client
            .get(format!("{}/api/rules", self.base_url))
            .send()
            .await?;

        let rules: Vec<EmailRule> = handle_response(response).await?;
        log::info!("Fetched {} rules from backend", rules.len());
        Ok(rules)
    }

    async fn get_rule(&self, rule_id: &str) -> Result<EmailRule, RulesApiError> {
        let response = self
            .client
            .get(format!("{}/api/rule/{}", self.base_url, rule_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RulesApiError::RuleNotFound(rule_id.to_string()));
        }

        handle_response(response).await
    }

    async fn toggle_rule(&self, rule_id: &str) -> Result<bool, RulesApiError> {
        let response = self
            .client
            .post(format!("{}/api/rule/{}/toggle", self.base_url, rule_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RulesApiError::RuleNotFound(rule_id.to_string()));
        }

        let toggled: ToggleResponse = handle_response(response).await?;
        log::info!(
            "Backend toggled rule {} to {}",
            toggled.rule_id,
            if toggled.is_active { "active" } else { "inactive" }
        );
        Ok(toggled.is_active)
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<(), RulesApiError> {
        let response = self
            .client
            .post(format!("{}/api/rule/{}/delete", self.base_url, rule_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RulesApiError::RuleNotFound(rule_id.to_string()));
        }

        if response.status().is_success() {
            log::info!("Deleted rule {}", rule_id);
            Ok(())
        } else {
            Err(handle_error(response).await)
        }
    }

    async fn save_rule(&self, req: &SaveRuleRequest) -> Result<EmailRule, RulesApiError> {
        let response = self
            .client
            .post(format!("{}/api/rule/save", self.base_url))
            .json(req)
            .send()
            .await?;

        let saved: EmailRule = handle_response(response).await?;
        log::info!("Saved rule {} ({})", saved.name, saved.rule_id);
        Ok(saved)
    }
}

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Body of the toggle endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleResponse {
    pub rule_id: String,
    pub is_active: bool,
}

/// Create/update payload for the save endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SaveRuleRequest {
    /// Absent for create, present for update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub name: String,
    pub description: String,
    pub query: String,
    pub action: ActionKind,
    pub max_results: u32,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RulesApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid response body from server")]
    InvalidResponse,
}

/// Handle successful JSON response
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RulesApiError> {
    let status = response.status();

    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|_| RulesApiError::InvalidResponse)
    } else {
        Err(handle_error(response).await)
    }
}

/// Convert an error response into a RulesApiError
async fn handle_error(response: reqwest::Response) -> RulesApiError {
    let status = response.status();
    let msg = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status.is_server_error() {
        RulesApiError::ServerError(msg)
    } else {
        RulesApiError::UnexpectedResponse(format!("{}: {}", status, msg))
    }
}
