//! Configuration loading from chatrelay.toml.

use adapter::{BackendProfile, ProviderKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variables that override the file.
pub const ENV_BASE_URL: &str = "CHATRELAY_BASE_URL";
pub const ENV_API_KEY: &str = "CHATRELAY_API_KEY";
pub const ENV_PROVIDER: &str = "CHATRELAY_PROVIDER";
pub const ENV_TIMEOUT_MS: &str = "CHATRELAY_TIMEOUT_MS";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Log filter used when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Backend connection settings.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Hosting provider.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Base URL of the deployment, e.g. `https://api.runpod.ai/v2/<id>`.
    pub base_url: Option<String>,

    /// Bearer token sent as `Authorization: Bearer <api_key>`.
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Advisory; requests are never retried.
    #[serde(default)]
    pub max_retries: u32,

    /// Endpoint overrides. Unset entries use the provider presets.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EndpointsConfig {
    pub chat: Option<String>,
    pub health: Option<String>,
    pub status: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: None,
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_retries: 0,
            endpoints: EndpointsConfig::default(),
            headers: BTreeMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration.
    pub fn default_config() -> Self {
        Self {
            backend: BackendConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.backend.base_url = Some(url);
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.backend.api_key = Some(key);
        }
        if let Some(provider) = lookup(ENV_PROVIDER) {
            self.backend.provider = provider.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_PROVIDER,
                value: provider,
            })?;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            self.backend.timeout_ms = timeout.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_MS,
                value: timeout,
            })?;
        }
        Ok(())
    }

    /// Build the backend profile.
    pub fn profile(&self) -> Result<BackendProfile, ConfigError> {
        let backend = &self.backend;
        let base_url = backend
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;

        let mut builder = BackendProfile::builder(backend.provider, base_url)
            .timeout(Duration::from_millis(backend.timeout_ms))
            .max_retries(backend.max_retries);

        if let Some(chat) = &backend.endpoints.chat {
            builder = builder.chat_endpoint(chat);
        }
        if let Some(health) = &backend.endpoints.health {
            builder = builder.health_endpoint(health);
        }
        if let Some(status) = &backend.endpoints.status {
            builder = builder.status_endpoint(status);
        }
        if let Some(key) = &backend.api_key {
            builder = builder.api_key(key);
        }
        for (name, value) in &backend.headers {
            builder = builder.header(name, value);
        }

        Ok(builder.preset_endpoints().build()?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("backend not configured: set backend.base_url or CHATRELAY_BASE_URL")]
    MissingBaseUrl,

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid backend profile: {0}")]
    Profile(#[from] adapter::Error),
}
