//! The request envelope threaded through the request phase.

use super::{Body, HeaderValue, Headers, Method, PrivateContext, RequestOptions};
use crate::adapter::Adapter;
use crate::errors::HttpflowError;
use crate::steps::{RequestPhase, ResponsePhase, Step};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// One logical HTTP call in flight.
#[derive(Clone)]
pub struct Request {
    /// Transport capability that performs the exchange.
    pub adapter: Arc<dyn Adapter>,
    /// HTTP verb.
    pub method: Method,
    /// Target URL; steps may extend its query.
    pub url: Url,
    /// Request headers, not normalized until `encode_headers` runs.
    pub headers: Headers<HeaderValue>,
    /// Request payload.
    pub body: Body,
    /// Caller options.
    pub options: Arc<RequestOptions>,
    /// Steps of the request phase, in execution order.
    pub request_steps: Vec<Step<RequestPhase>>,
    /// Steps of the response phase, in execution order.
    pub response_steps: Vec<Step<ResponsePhase>>,
    /// Scratch state for inter-step communication.
    pub private: PrivateContext,
    halted: bool,
}

impl Request {
    /// Creates a request with no steps attached.
    #[must_use]
    pub fn new(adapter: Arc<dyn Adapter>, method: Method, url: Url) -> Self {
        Self {
            adapter,
            method,
            url,
            headers: Headers::new(),
            body: Body::Empty,
            options: Arc::new(RequestOptions::default()),
            request_steps: Vec::new(),
            response_steps: Vec::new(),
            private: PrivateContext::new(),
            halted: false,
        }
    }

    /// Parses `url` and builds a request carrying `options`.
    pub fn build(
        adapter: Arc<dyn Adapter>,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Self, HttpflowError> {
        let parsed = Url::parse(url).map_err(|source| HttpflowError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::new(adapter, method, parsed).with_options(options))
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.push(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends request steps after the existing ones.
    #[must_use]
    pub fn append_request_steps(mut self, steps: impl IntoIterator<Item = Step<RequestPhase>>) -> Self {
        self.request_steps.extend(steps);
        self
    }

    /// Appends response steps after the existing ones.
    #[must_use]
    pub fn append_response_steps(
        mut self,
        steps: impl IntoIterator<Item = Step<ResponsePhase>>,
    ) -> Self {
        self.response_steps.extend(steps);
        self
    }

    /// Returns true once a step has halted the current attempt.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Marks the current attempt halted. There is no way back.
    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    /// Returns the adapter's name.
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("adapter", &self.adapter.name())
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("request_steps", &self.request_steps.len())
            .field("response_steps", &self.response_steps.len())
            .field("private", &self.private)
            .field("halted", &self.halted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAdapter;

    #[test]
    fn test_build_parses_url() {
        let adapter = Arc::new(MockAdapter::new());
        let request = Request::build(
            adapter,
            Method::Get,
            "https://example.com/items?page=2",
            RequestOptions::default(),
        )
        .unwrap();

        assert_eq!(request.url.host_str(), Some("example.com"));
        assert_eq!(request.url.query(), Some("page=2"));
        assert!(!request.is_halted());
    }

    #[test]
    fn test_build_rejects_bad_url() {
        let adapter = Arc::new(MockAdapter::new());
        let err = Request::build(adapter, Method::Get, "not a url", RequestOptions::default())
            .unwrap_err();
        assert!(matches!(err, HttpflowError::InvalidUrl { .. }));
    }

    #[test]
    fn test_halt_is_sticky() {
        let adapter = Arc::new(MockAdapter::new());
        let mut request =
            Request::new(adapter, Method::Get, Url::parse("http://localhost/").unwrap());
        request.halt();
        let cloned = request.clone();
        assert!(cloned.is_halted());
    }
}
