//! Caller-facing options recognized by the pipeline.

use crate::retry::RetryConfig;
use crate::steps::{RequestPhase, ResponsePhase, Step};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Adapter option carrying the per-request timeout in milliseconds.
pub const TIMEOUT_MS_OPTION: &str = "timeout_ms";

/// Authentication scheme applied by the `auth` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    /// `authorization: Basic <base64(user:pass)>`
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// `authorization: Bearer <token>`
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// Immutable per-call options.
///
/// Steps consult these but never change them; only their effects land on
/// the request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Authentication to inject.
    pub auth: Option<Auth>,
    /// Query parameters merged into the URL.
    pub params: Vec<(String, String)>,
    /// Retry policy.
    pub retry: RetryConfig,
    /// Leave the response body exactly as received.
    pub raw: bool,
    /// Decompress and decode the response body.
    pub decode_body: bool,
    /// Extra request steps supplied by the caller.
    pub request_steps: Vec<Step<RequestPhase>>,
    /// Extra response steps supplied by the caller.
    pub response_steps: Vec<Step<ResponsePhase>>,
    /// Options passed through to the adapter untouched.
    pub adapter_options: HashMap<String, Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            auth: None,
            params: Vec::new(),
            retry: RetryConfig::default(),
            raw: false,
            decode_body: true,
            request_steps: Vec::new(),
            response_steps: Vec::new(),
            adapter_options: HashMap::new(),
        }
    }
}

impl RequestOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses basic authentication.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Auth::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Uses bearer authentication.
    #[must_use]
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer {
            token: token.into(),
        });
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Keeps the response body raw.
    #[must_use]
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Turns response decompression and decoding on or off.
    #[must_use]
    pub fn decode_body(mut self, decode: bool) -> Self {
        self.decode_body = decode;
        self
    }

    /// Appends a caller request step.
    #[must_use]
    pub fn with_request_step(mut self, step: Step<RequestPhase>) -> Self {
        self.request_steps.push(step);
        self
    }

    /// Appends a caller response step.
    #[must_use]
    pub fn with_response_step(mut self, step: Step<ResponsePhase>) -> Self {
        self.response_steps.push(step);
        self
    }

    /// Sets an adapter option.
    #[must_use]
    pub fn with_adapter_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.adapter_options.insert(key.into(), value);
        self
    }

    /// Sets the transport timeout.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.with_adapter_option(TIMEOUT_MS_OPTION, Value::from(millis))
    }

    /// Returns true if neither decompression nor decoding should run.
    #[must_use]
    pub fn skips_decoding(&self) -> bool {
        self.raw || !self.decode_body
    }
}
