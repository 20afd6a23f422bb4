//! Backend profile: the connection parameters for one deployment target.

use crate::provider::ProviderKind;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::time::Duration;

/// Path appended to the base URL when no chat endpoint is configured.
pub const DEFAULT_CHAT_PATH: &str = "/runsync";

/// Default request timeout. Generous enough to ride out a serverless cold start.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CONTENT_TYPE: &str = "Content-Type";
const JSON: &str = "application/json";

/// Endpoint locations. Each may be an absolute URL or a path under the base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub chat: Option<String>,
    pub health: Option<String>,
    pub status: Option<String>,
}

/// Connection parameters for a backend.
///
/// Built once through [`BackendProfile::builder`] and read-only afterwards.
/// Adapters share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct BackendProfile {
    provider: ProviderKind,
    base_url: String,
    endpoints: Endpoints,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
    headers: BTreeMap<String, String>,
}

impl BackendProfile {
    /// Create a builder for the given provider and base URL.
    pub fn builder(provider: ProviderKind, base_url: impl Into<String>) -> BackendProfileBuilder {
        BackendProfileBuilder::new(provider, base_url)
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Configured retry budget. Advisory only: adapters never retry.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// URL for chat requests: the chat endpoint, else `base_url + /runsync`.
    pub fn chat_url(&self) -> String {
        match &self.endpoints.chat {
            Some(chat) => self.resolve(chat),
            None => self.resolve(DEFAULT_CHAT_PATH),
        }
    }

    pub fn health_url(&self) -> Option<String> {
        self.endpoints.health.as_deref().map(|e| self.resolve(e))
    }

    pub fn status_url(&self) -> Option<String> {
        self.endpoints.status.as_deref().map(|e| self.resolve(e))
    }

    /// Headers for an outbound request, with bearer auth when a key is set.
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.retain(|name, _| !name.eq_ignore_ascii_case("Authorization"));
            headers.insert("Authorization".to_string(), format!("Bearer {key}"));
        }
        headers
    }

    fn resolve(&self, endpoint: &str) -> String {
        if is_absolute(endpoint) {
            return endpoint.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Builder for [`BackendProfile`].
#[derive(Debug, Clone)]
pub struct BackendProfileBuilder {
    provider: ProviderKind,
    base_url: String,
    endpoints: Endpoints,
    api_key: Option<String>,
    timeout: Duration,
    max_retries: u32,
    headers: BTreeMap<String, String>,
}

impl BackendProfileBuilder {
    pub fn new(provider: ProviderKind, base_url: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            endpoints: Endpoints::default(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            headers: BTreeMap::new(),
        }
    }

    pub fn chat_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.chat = Some(endpoint.into());
        self
    }

    pub fn health_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.health = Some(endpoint.into());
        self
    }

    pub fn status_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.status = Some(endpoint.into());
        self
    }

    /// Fill any endpoint left unset with the provider's preset path.
    pub fn preset_endpoints(mut self) -> Self {
        let preset = self.provider.preset_endpoints();
        self.endpoints.chat = self.endpoints.chat.or(preset.chat);
        self.endpoints.health = self.endpoints.health.or(preset.health);
        self.endpoints.status = self.endpoints.status.or(preset.status);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Validate and build the profile.
    pub fn build(mut self) -> Result<BackendProfile> {
        let base_url = self.base_url.trim().to_string();
        if base_url.is_empty() {
            return Err(Error::Config("base URL is empty".into()));
        }
        if !is_absolute(&base_url) {
            return Err(Error::Config(format!(
                "base URL must start with http:// or https://: {base_url}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }

        let has_content_type = self
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE));
        if !has_content_type {
            self.headers.insert(CONTENT_TYPE.to_string(), JSON.to_string());
        }

        Ok(BackendProfile {
            provider: self.provider,
            base_url,
            endpoints: self.endpoints,
            api_key: self.api_key,
            timeout: self.timeout,
            max_retries: self.max_retries,
            headers: self.headers,
        })
    }
}
