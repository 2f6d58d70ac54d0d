//! Console configuration
//!
//! Read from environment variables (a local `.env` file is honored by the
//! binary via dotenvy).

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the console binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the rules backend
    pub api_base_url: String,
    /// Request timeout for backend calls
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Build configuration from `RULES_API_BASE_URL` and
    /// `RULES_API_TIMEOUT_SECS`, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url =
            std::env::var("RULES_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        url::Url::parse(&api_base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(api_base_url.clone(), e.to_string()))?;

        let timeout_secs = match std::env::var("RULES_API_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid RULES_API_BASE_URL '{0}': {1}")]
    InvalidBaseUrl(String, String),

    #[error("Invalid RULES_API_TIMEOUT_SECS '{0}': expected seconds")]
    InvalidTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
