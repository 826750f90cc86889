//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.open5e.com";
pub const DEFAULT_TIMEOUT: f64 = 10.0;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: f64 = 0.5;

/// Settings fixed for the lifetime of an `Open5eClient`.
///
/// `timeout` and `retry_backoff` are in seconds. `retries` counts
/// re-attempts after the first connection attempt fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: f64,
    pub retries: u32,
    pub retry_backoff: f64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            user_agent: concat!("open5e-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, seconds: f64) -> Self {
        self.retry_backoff = seconds;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Check the settings and convert the durations.
    pub(crate) fn validate(&self) -> Result<ValidatedConfig, ApiError> {
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            return Err(ApiError::ConfigError(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout
            )));
        }
        if !self.retry_backoff.is_finite() || self.retry_backoff < 0.0 {
            return Err(ApiError::ConfigError(format!(
                "retry_backoff must be zero or more seconds, got {}",
                self.retry_backoff
            )));
        }
        let base = url::Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::ConfigError(format!("base_url {:?}: {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ApiError::ConfigError(format!(
                "base_url must be an absolute http(s) URL, got {:?}",
                self.base_url
            )));
        }
        let timeout = Duration::try_from_secs_f64(self.timeout)
            .map_err(|e| ApiError::ConfigError(format!("timeout: {e}")))?;
        let retry_backoff = Duration::try_from_secs_f64(self.retry_backoff)
            .map_err(|e| ApiError::ConfigError(format!("retry_backoff: {e}")))?;

        Ok(ValidatedConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout,
            retries: self.retries,
            retry_backoff,
            user_agent: self.user_agent.clone(),
        })
    }
}

/// `ClientConfig` after validation, with durations resolved.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
    pub user_agent: String,
}
