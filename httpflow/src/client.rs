//! Caller-facing client.
//!
//! A [`Client`] owns an adapter and the defaults every request starts from.
//! It assembles the default step lists around the caller's steps and hands
//! the request to the [`Pipeline`].
//!
//! Request phase: `encode_headers`, `put_default_headers`, `encode_body`,
//! `proxy` (only with proxies configured), `auth`, `put_params`, client and
//! caller request steps, `log_request_start`, `adapter`.
//!
//! Response phase: `downcase_headers`, `decompress_body`, `decode_body`,
//! client and caller response steps, `retry`, `log_response_end`.

use crate::adapter::Adapter;
use crate::config::ClientConfig;
use crate::core::{Body, Method, Outcome, Request, RequestOptions};
use crate::errors::HttpflowError;
use crate::events::{get_event_sink, EventSink};
use crate::pipeline::Pipeline;
use crate::retry::{RetryConfig, RetryStep, Sleeper, TokioSleeper};
use crate::steps::{
    AdapterStep, AuthStep, DecodeBody, DecompressBody, DowncaseHeaders, EncodeBody,
    EncodeHeaders, LogRequestStart, LogResponseEnd, ProxyDefinition, ProxyStep,
    PutDefaultHeaders, PutParams, RequestPhase, ResponsePhase, Step, StepRegistry,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

/// An HTTP client running every call through the step pipeline.
#[derive(Debug, Clone)]
pub struct Client {
    adapter: Arc<dyn Adapter>,
    base_url: Option<Url>,
    defaults: RequestOptions,
    request_prefix: Vec<Step<RequestPhase>>,
    request_suffix: Vec<Step<RequestPhase>>,
    response_prefix: Vec<Step<ResponsePhase>>,
    response_suffix: Vec<Step<ResponsePhase>>,
    pipeline: Pipeline,
}

impl Client {
    /// Starts building a client over `adapter`.
    pub fn builder(adapter: Arc<dyn Adapter>) -> ClientBuilder {
        ClientBuilder::new(adapter)
    }

    /// Builds a client over the reqwest adapter with default settings.
    #[cfg(feature = "reqwest")]
    pub fn new() -> Result<Self, HttpflowError> {
        Self::builder(Arc::new(crate::adapter::ReqwestAdapter::new())).build()
    }

    /// Builds a client from configuration.
    ///
    /// Extra steps named in the configuration are resolved against the
    /// built-in steps; an unknown name is a step contract violation.
    pub fn from_config(config: &ClientConfig, adapter: Arc<dyn Adapter>) -> Result<Self, HttpflowError> {
        Self::builder(adapter).with_config(config).build()
    }

    /// Returns the options every request starts from.
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        self.defaults.clone()
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolves `url` against the base URL, if any.
    pub fn resolve_url(&self, url: &str) -> Result<Url, HttpflowError> {
        let resolved = match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|source| HttpflowError::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    /// Builds a request with the full default step lists attached.
    pub fn build_request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Request, HttpflowError> {
        let url = self.resolve_url(url)?;
        let caller_request_steps = options.request_steps.clone();
        let caller_response_steps = options.response_steps.clone();

        Ok(Request::new(Arc::clone(&self.adapter), method, url)
            .with_options(options)
            .append_request_steps(self.request_prefix.iter().cloned())
            .append_request_steps(caller_request_steps)
            .append_request_steps(self.request_suffix.iter().cloned())
            .append_response_steps(self.response_prefix.iter().cloned())
            .append_response_steps(caller_response_steps)
            .append_response_steps(self.response_suffix.iter().cloned()))
    }

    /// Runs a prepared request.
    pub async fn send(&self, request: Request) -> Result<Outcome, HttpflowError> {
        self.pipeline.run(request).await
    }

    /// Builds and runs a request.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
        body: impl Into<Body> + Send,
    ) -> Result<Outcome, HttpflowError> {
        let request = self.build_request(method, url, options)?.with_body(body);
        self.send(request).await
    }

    /// `GET url`.
    pub async fn get(&self, url: &str) -> Result<Outcome, HttpflowError> {
        self.request(Method::Get, url, self.options(), Body::Empty).await
    }

    /// `HEAD url`.
    pub async fn head(&self, url: &str) -> Result<Outcome, HttpflowError> {
        self.request(Method::Head, url, self.options(), Body::Empty).await
    }

    /// `DELETE url`.
    pub async fn delete(&self, url: &str) -> Result<Outcome, HttpflowError> {
        self.request(Method::Delete, url, self.options(), Body::Empty).await
    }

    /// `POST url` with a body.
    pub async fn post(&self, url: &str, body: impl Into<Body> + Send) -> Result<Outcome, HttpflowError> {
        self.request(Method::Post, url, self.options(), body).await
    }

    /// `PUT url` with a body.
    pub async fn put(&self, url: &str, body: impl Into<Body> + Send) -> Result<Outcome, HttpflowError> {
        self.request(Method::Put, url, self.options(), body).await
    }

    /// `PATCH url` with a body.
    pub async fn patch(&self, url: &str, body: impl Into<Body> + Send) -> Result<Outcome, HttpflowError> {
        self.request(Method::Patch, url, self.options(), body).await
    }
}

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    adapter: Arc<dyn Adapter>,
    base_url: Option<String>,
    default_headers: Vec<(String, String)>,
    defaults: RequestOptions,
    proxies: Vec<ProxyDefinition>,
    sink: Option<Arc<dyn EventSink>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    pipeline: Pipeline,
    extra_request_steps: Vec<Step<RequestPhase>>,
    extra_response_steps: Vec<Step<ResponsePhase>>,
    extra_request_names: Vec<String>,
    extra_response_names: Vec<String>,
}

impl ClientBuilder {
    /// Creates a builder over `adapter`.
    #[must_use]
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            base_url: None,
            default_headers: Vec::new(),
            defaults: RequestOptions::default(),
            proxies: Vec::new(),
            sink: None,
            sleeper: None,
            pipeline: Pipeline::default(),
            extra_request_steps: Vec::new(),
            extra_response_steps: Vec::new(),
            extra_request_names: Vec::new(),
            extra_response_names: Vec::new(),
        }
    }

    /// Applies every setting of a configuration.
    #[must_use]
    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.base_url.clone_from(&config.base_url);
        self.default_headers = config
            .default_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        self.defaults = config.request_options();
        self.proxies.clone_from(&config.proxies);
        self.pipeline = self.pipeline.with_max_attempts(config.max_attempts);
        self.extra_request_names.clone_from(&config.extra_request_steps);
        self.extra_response_names.clone_from(&config.extra_response_steps);
        self
    }

    /// Sets the base URL relative paths are joined onto.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header sent with every request unless already present.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the options every request starts from.
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Sets the default retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.defaults.retry = retry;
        self
    }

    /// Adds a transport pool reached through a proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyDefinition) -> Self {
        self.proxies.push(proxy);
        self
    }

    /// Sets the telemetry sink; defaults to the global sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets how retry delays are waited out.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Sets the absolute attempt limit per call.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.pipeline = self.pipeline.with_max_attempts(max_attempts);
        self
    }

    /// Adds a request step run on every call, before the caller's own.
    #[must_use]
    pub fn with_request_step(mut self, step: Step<RequestPhase>) -> Self {
        self.extra_request_steps.push(step);
        self
    }

    /// Adds a response step run on every call, before the caller's own.
    #[must_use]
    pub fn with_response_step(mut self, step: Step<ResponsePhase>) -> Self {
        self.extra_response_steps.push(step);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client, HttpflowError> {
        let base_url = self.base_url.as_deref().map(parse_base_url).transpose()?;
        let sink = self.sink.unwrap_or_else(get_event_sink);
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        let registry = StepRegistry::with_builtins(Arc::clone(&sink), Arc::clone(&sleeper));
        let mut extra_request = registry.request_steps(&self.extra_request_names)?;
        extra_request.extend(self.extra_request_steps);
        let mut extra_response = registry.response_steps(&self.extra_response_names)?;
        extra_response.extend(self.extra_response_steps);

        let default_headers: Map<String, Value> = self
            .default_headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        let mut request_prefix = vec![
            Step::handler(EncodeHeaders),
            Step::with_options(PutDefaultHeaders, default_headers),
            Step::handler(EncodeBody),
        ];
        if !self.proxies.is_empty() {
            request_prefix.push(Step::handler(ProxyStep::new(self.proxies)));
        }
        request_prefix.push(Step::handler(AuthStep));
        request_prefix.push(Step::handler(PutParams));
        request_prefix.extend(extra_request);

        let request_suffix = vec![
            Step::handler(LogRequestStart::new(Arc::clone(&sink))),
            Step::handler(AdapterStep),
        ];

        let mut response_prefix = vec![
            Step::handler(DowncaseHeaders),
            Step::handler(DecompressBody),
            Step::handler(DecodeBody),
        ];
        response_prefix.extend(extra_response);

        let response_suffix = vec![
            Step::handler(RetryStep::new(sleeper)),
            Step::handler(LogResponseEnd::new(sink)),
        ];

        Ok(Client {
            adapter: self.adapter,
            base_url,
            defaults: self.defaults,
            request_prefix,
            request_suffix,
            response_prefix,
            response_suffix,
            pipeline: self.pipeline,
        })
    }
}

/// Parses a base URL, making sure relative paths join below its path.
fn parse_base_url(raw: &str) -> Result<Url, HttpflowError> {
    let mut url = Url::parse(raw).map_err(|source| HttpflowError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
