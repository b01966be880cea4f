//! Built-in request-phase steps.
//!
//! Each step is exposed twice: as a plain function over the request, and as
//! a [`StepHandler`] the default assembly plugs into the pipeline.

use super::{RequestFlow, RequestPhase, StepArgs, StepHandler, StepResult};
use crate::adapter::dispatch;
use crate::core::{Auth, Body, HeaderValue, Request, PROXY_URL_KEY, TRANSPORT_POOL_KEY};
use crate::errors::HttpflowError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

/// Lowercases a header name and turns spaces and underscores into hyphens.
#[must_use]
pub fn normalize_header_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Normalizes every header name and encodes every value as text.
#[must_use]
pub fn encode_headers(mut request: Request) -> Request {
    request.headers = std::mem::take(&mut request.headers)
        .map(|name, value| (normalize_header_name(&name), HeaderValue::Text(value.encode())));
    request
}

/// Adds `accept-encoding: gzip` and any `extra` defaults, never overriding.
#[must_use]
pub fn put_default_headers(mut request: Request, extra: &[(String, String)]) -> Request {
    request.headers.put_new("accept-encoding", "gzip");
    for (name, value) in extra {
        request
            .headers
            .put_new(normalize_header_name(name), value.as_str());
    }
    request
}

/// Injects the `authorization` header described by the options.
#[must_use]
pub fn auth(mut request: Request) -> Request {
    let value = match &request.options.auth {
        Some(Auth::Basic { username, password }) => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
        Some(Auth::Bearer { token }) => format!("Bearer {token}"),
        None => return request,
    };
    request.headers.put_new("authorization", value);
    request
}

/// Encodes a form or JSON body into bytes and sets its content type.
pub fn encode_body(mut request: Request) -> StepResult<Request> {
    match std::mem::take(&mut request.body) {
        Body::Form(pairs) => {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter())
                .finish();
            request
                .headers
                .put_new("content-type", "application/x-www-form-urlencoded");
            request.body = Body::Bytes(encoded.into_bytes());
        }
        Body::Json(value) => {
            let bytes =
                serde_json::to_vec(&value).map_err(|e| HttpflowError::Encode(e.to_string()))?;
            request.headers.put_new("content-type", "application/json");
            request.body = Body::Bytes(bytes);
        }
        other => request.body = other,
    }
    Ok(request)
}

/// Appends URL-encoded `params` to the query string.
#[must_use]
pub fn put_params(mut request: Request, params: &[(String, String)]) -> Request {
    if params.is_empty() {
        return request;
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    let query = match request.url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    request.url.set_query(Some(&query));
    request
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `encode_headers` as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeHeaders;

#[async_trait]
impl StepHandler<RequestPhase> for EncodeHeaders {
    fn name(&self) -> &str {
        "encode_headers"
    }

    async fn run(&self, request: Request, _args: StepArgs<'_>) -> StepResult<RequestFlow> {
        Ok(RequestFlow::Continue(encode_headers(request)))
    }
}

/// `put_default_headers` as a step.
///
/// Named options are added as further default headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutDefaultHeaders;

#[async_trait]
impl StepHandler<RequestPhase> for PutDefaultHeaders {
    fn name(&self) -> &str {
        "put_default_headers"
    }

    async fn run(&self, request: Request, args: StepArgs<'_>) -> StepResult<RequestFlow> {
        let extra: Vec<(String, String)> = match args {
            StepArgs::Options(options) => options
                .iter()
                .map(|(name, value)| (name.clone(), param_value(value)))
                .collect(),
            StepArgs::Args(_) => {
                return Err(HttpflowError::step_contract(
                    self.name(),
                    "expects named options, got positional arguments",
                ))
            }
            StepArgs::None => Vec::new(),
        };
        Ok(RequestFlow::Continue(put_default_headers(request, &extra)))
    }
}

/// `auth` as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthStep;

#[async_trait]
impl StepHandler<RequestPhase> for AuthStep {
    fn name(&self) -> &str {
        "auth"
    }

    async fn run(&self, request: Request, _args: StepArgs<'_>) -> StepResult<RequestFlow> {
        Ok(RequestFlow::Continue(auth(request)))
    }
}

/// `encode_body` as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeBody;

#[async_trait]
impl StepHandler<RequestPhase> for EncodeBody {
    fn name(&self) -> &str {
        "encode_body"
    }

    async fn run(&self, request: Request, _args: StepArgs<'_>) -> StepResult<RequestFlow> {
        encode_body(request).map(RequestFlow::Continue)
    }
}

/// `put_params` as a step.
///
/// Merges the `params` option, then any named step options.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutParams;

#[async_trait]
impl StepHandler<RequestPhase> for PutParams {
    fn name(&self) -> &str {
        "put_params"
    }

    async fn run(&self, request: Request, args: StepArgs<'_>) -> StepResult<RequestFlow> {
        let mut params = request.options.params.clone();
        match args {
            StepArgs::Options(options) => {
                params.extend(
                    options
                        .iter()
                        .map(|(key, value)| (key.clone(), param_value(value))),
                );
            }
            StepArgs::Args(_) => {
                return Err(HttpflowError::step_contract(
                    self.name(),
                    "expects named options, got positional arguments",
                ))
            }
            StepArgs::None => {}
        }
        Ok(RequestFlow::Continue(put_params(request, &params)))
    }
}

/// A named transport pool reached through a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDefinition {
    /// Pool identity.
    pub name: String,
    /// Proxy URL handed to the adapter.
    pub url: String,
}

impl ProxyDefinition {
    /// Creates a proxy definition.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Picks one configured proxy at random and records it for the adapter.
#[derive(Debug, Clone, Default)]
pub struct ProxyStep {
    proxies: Vec<ProxyDefinition>,
}

impl ProxyStep {
    /// Creates a proxy step over the given pools.
    #[must_use]
    pub fn new(proxies: Vec<ProxyDefinition>) -> Self {
        Self { proxies }
    }
}

#[async_trait]
impl StepHandler<RequestPhase> for ProxyStep {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn run(&self, mut request: Request, _args: StepArgs<'_>) -> StepResult<RequestFlow> {
        let chosen = self.proxies.choose(&mut rand::thread_rng());
        if let Some(proxy) = chosen {
            tracing::debug!(pool = %proxy.name, "Selected transport pool");
            request
                .private
                .insert(TRANSPORT_POOL_KEY, Value::String(proxy.name.clone()));
            request
                .private
                .insert(PROXY_URL_KEY, Value::String(proxy.url.clone()));
        }
        Ok(RequestFlow::Continue(request))
    }
}

/// Terminal request step: performs the exchange through the adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterStep;

#[async_trait]
impl StepHandler<RequestPhase> for AdapterStep {
    fn name(&self) -> &str {
        "adapter"
    }

    async fn run(&self, request: Request, _args: StepArgs<'_>) -> StepResult<RequestFlow> {
        Ok(RequestFlow::Dispatched(dispatch(request).await))
    }
}
