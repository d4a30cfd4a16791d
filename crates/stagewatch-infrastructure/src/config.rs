//! Client configuration.
//!
//! Loaded from `config.toml` (see `StagewatchPaths`), then overridden by
//! environment variables. A missing file yields the defaults; a malformed
//! one is an error.

use crate::paths::StagewatchPaths;
use serde::{Deserialize, Serialize};
use stagewatch_core::retry::RetryPolicy;
use stagewatch_core::session::{DEFAULT_DERIVED_PATTERN, DerivedSessionRule};
use stagewatch_core::{Result, SyncError};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_URL_ENV_VAR: &str = "STAGEWATCH_API_URL";
pub const WS_URL_ENV_VAR: &str = "STAGEWATCH_WS_URL";
pub const TOKEN_ENV_VAR: &str = "STAGEWATCH_TOKEN";

/// Grace window for sessions the backend may still be materializing.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DerivedSessionConfig {
    /// Regex recognizing derived-session ids
    pub pattern: String,
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl Default for DerivedSessionConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DERIVED_PATTERN.to_string(),
            max_attempts: 3,
            interval_ms: 2000,
        }
    }
}

/// Reconnect backoff of the event stream.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms))
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `https://host/api`
    pub api_base_url: String,
    /// Base URL of the event stream; derived from `api_base_url` when absent
    pub ws_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub derived_session: DerivedSessionConfig,
    pub reconnect: ReconnectConfig,
    /// Sessions per page when listing
    pub page_size: u32,
    /// Detail text shown right after a resume is accepted
    pub processing_detail: String,
    /// Bearer token; usually supplied through `STAGEWATCH_TOKEN` instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            ws_base_url: None,
            request_timeout_secs: 30,
            derived_session: DerivedSessionConfig::default(),
            reconnect: ReconnectConfig::default(),
            page_size: 20,
            processing_detail: "Processing your response...".to_string(),
            token: None,
        }
    }
}

impl ClientConfig {
    /// Loads the configuration using the standard resolution order, then
    /// applies environment overrides.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let mut config = match StagewatchPaths::resolve_config_file(explicit) {
            Some(path) => Self::load_from(&path)?,
            None => {
                tracing::debug!("[ClientConfig] No config directory; using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(
                "[ClientConfig] {} not found; using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            SyncError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("[ClientConfig] Loaded {}", path.display());
        Ok(config)
    }

    /// Applies `STAGEWATCH_API_URL`, `STAGEWATCH_WS_URL` and `STAGEWATCH_TOKEN`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV_VAR).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV_VAR).filter(|v| !v.is_empty()) {
            self.ws_base_url = Some(url);
        }
        if let Some(token) = lookup(TOKEN_ENV_VAR).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(SyncError::config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.page_size == 0 {
            return Err(SyncError::config("page_size must be positive"));
        }
        self.derived_rule()?;
        Ok(())
    }

    /// API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Event stream base: the configured value, or the API URL with its
    /// scheme switched to `ws`/`wss`.
    pub fn ws_base(&self) -> String {
        if let Some(url) = &self.ws_base_url {
            return url.trim_end_matches('/').to_string();
        }
        let api = self.api_base();
        if let Some(rest) = api.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = api.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            api.to_string()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn derived_rule(&self) -> Result<DerivedSessionRule> {
        DerivedSessionRule::new(&self.derived_session.pattern)
    }

    /// Retry policy applied to derived sessions that read as "not found".
    pub fn derived_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::derived_session_grace(
            self.derived_session.max_attempts,
            Duration::from_millis(self.derived_session.interval_ms),
        )
    }
}
