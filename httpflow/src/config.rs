//! Client configuration, loadable from JSON.

use crate::core::RequestOptions;
use crate::errors::HttpflowError;
use crate::pipeline::MAX_ATTEMPTS;
use crate::retry::RetryConfig;
use crate::steps::ProxyDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

fn default_decode_body() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}

/// Everything a [`crate::client::Client`] can be built from.
///
/// All fields are optional in the serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL that relative request paths are joined onto.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Headers added to every request unless already present.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Default retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Leave response bodies exactly as received.
    #[serde(default)]
    pub raw: bool,
    /// Decompress and decode response bodies.
    #[serde(default = "default_decode_body")]
    pub decode_body: bool,
    /// Per-request timeout handed to the adapter.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Transport pools to pick from at random.
    #[serde(default)]
    pub proxies: Vec<ProxyDefinition>,
    /// Built-in request steps, by name, run after the default request steps.
    #[serde(default)]
    pub extra_request_steps: Vec<String>,
    /// Built-in response steps, by name, run before `retry`.
    #[serde(default)]
    pub extra_response_steps: Vec<String>,
    /// Absolute attempt limit per call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_headers: BTreeMap::new(),
            retry: RetryConfig::default(),
            raw: false,
            decode_body: default_decode_body(),
            timeout_ms: None,
            proxies: Vec::new(),
            extra_request_steps: Vec::new(),
            extra_response_steps: Vec::new(),
            max_attempts: default_max_attempts(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl ClientConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, HttpflowError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| HttpflowError::Config(format!("invalid client config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HttpflowError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks URLs and limits.
    pub fn validate(&self) -> Result<(), HttpflowError> {
        if let Some(base_url) = &self.base_url {
            parse_url(base_url)?;
        }
        for proxy in &self.proxies {
            parse_url(&proxy.url)?;
        }
        if self.max_attempts == 0 {
            return Err(HttpflowError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Request options carrying the configured defaults.
    #[must_use]
    pub fn request_options(&self) -> RequestOptions {
        let options = RequestOptions::new()
            .with_retry(self.retry.clone())
            .raw(self.raw)
            .decode_body(self.decode_body);
        match self.timeout_ms {
            Some(ms) => options.timeout(Duration::from_millis(ms)),
            None => options,
        }
    }
}

fn parse_url(url: &str) -> Result<Url, HttpflowError> {
    Url::parse(url).map_err(|source| HttpflowError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}
