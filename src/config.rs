//! Runtime settings loaded from an optional `config.yaml`.
//!
//! Every field has a default, so an absent file or a partial one both work.
//! The API key is not part of the file: it comes from the
//! command line or the environment and is checked when the HTTP client is
//! built (see [`crate::translator::ChatClient::new`]).
//!
//! ```yaml
//! api:
//!   model: Qwen/Qwen2.5-72B-Instruct
//!   min_interval_ms: 500
//! retry:
//!   max_attempts: 3
//! batch:
//!   round_pause_ms: 1000
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Top-level settings document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub retry: RetrySettings,
    pub site: SiteSettings,
    pub batch: BatchSettings,
}

/// Chat-completion endpoint parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Minimum spacing between the starts of two consecutive calls.
    pub min_interval_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.siliconflow.cn/v1/chat/completions".to_string(),
            model: "Qwen/Qwen2.5-72B-Instruct".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: 20,
            min_interval_ms: 500,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Per-paragraph retry policy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_ms: 250,
        }
    }
}

/// Source site layout and politeness delays.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteSettings {
    pub base_url: String,
    pub list_page: String,
    pub request_delay_ms: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.paulgraham.com/".to_string(),
            list_page: "articles.html".to_string(),
            request_delay_ms: 500,
            fetch_timeout_secs: 15,
        }
    }
}

impl SiteSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Batch driver pacing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchSettings {
    pub article_pause_ms: u64,
    pub round_pause_ms: u64,
    /// Per-article deadline; unset means no deadline.
    pub article_timeout_secs: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            article_pause_ms: 0,
            round_pause_ms: 1000,
            article_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), model = %settings.api.model, "Loaded configuration");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Normalize an API key: blank strings count as missing.
pub fn resolve_api_key(key: Option<String>) -> Result<String, ConfigError> {
    key.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::MissingApiKey)
}
