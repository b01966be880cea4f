//! Mock adapters and sleepers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

use crate::adapter::Adapter;
use crate::core::{Body, Method, Outcome, Request, Response};
use crate::errors::TransportError;
use crate::retry::Sleeper;

/// What a test adapter saw for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// HTTP verb.
    pub method: Method,
    /// URL as sent.
    pub url: Url,
    /// Headers as sent, values encoded.
    pub headers: Vec<(String, String)>,
    /// Body as sent.
    pub body: Body,
    /// Retry counter at dispatch time.
    pub retry_count: u32,
}

impl RecordedRequest {
    fn capture(request: &Request) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request
                .headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.encode()))
                .collect(),
            body: request.body.clone(),
            retry_count: request.private.retry_count,
        }
    }

    /// Returns a header value, ignoring name case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An adapter replaying scripted outcomes.
///
/// Outcomes are consumed in order; the last one repeats forever. With
/// nothing scripted every call answers `200` with an empty body.
#[derive(Debug)]
pub struct MockAdapter {
    name: String,
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdapter {
    /// Creates a mock named `mock`.
    #[must_use]
    pub fn new() -> Self {
        Self::named("mock")
    }

    /// Creates a mock with a custom name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Scripts a response.
    pub fn push_response(&self, response: Response) {
        self.outcomes.lock().push_back(Ok(response));
    }

    /// Scripts a transport error.
    pub fn push_error(&self, error: TransportError) {
        self.outcomes.lock().push_back(Err(error));
    }

    /// Scripts one response per status code.
    pub fn push_statuses(&self, statuses: &[u16]) {
        for status in statuses {
            self.push_response(Response::new(*status));
        }
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns every request seen, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn next_outcome(&self) -> Outcome {
        let mut outcomes = self.outcomes.lock();
        if outcomes.len() > 1 {
            outcomes.pop_front().unwrap_or_else(|| Ok(Response::new(200)))
        } else {
            outcomes.front().cloned().unwrap_or_else(|| Ok(Response::new(200)))
        }
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().push(RecordedRequest::capture(request));
        self.next_outcome()
    }
}

/// An adapter that answers `200` with the request body and content type.
///
/// The method is echoed in `x-echo-method`.
#[derive(Debug, Default)]
pub struct EchoAdapter;

#[async_trait]
impl Adapter for EchoAdapter {
    fn name(&self) -> &str {
        "echo"
    }

    async fn call(&self, request: &Request) -> Result<Response, TransportError> {
        let body = match &request.body {
            Body::Empty => Body::Empty,
            Body::Bytes(bytes) => Body::Bytes(bytes.clone()),
            Body::Form(_) | Body::Json(_) => {
                return Err(TransportError::protocol("body was never encoded"));
            }
        };

        let mut response = Response::new(200)
            .with_header("X-Echo-Method", request.method.as_str())
            .with_body(body);
        if let Some(content_type) = request.headers.get("content-type") {
            response = response.with_header("Content-Type", content_type.encode());
        }
        Ok(response)
    }
}

/// A sleeper that records delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every delay requested, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Returns the number of sleeps.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.sleeps.lock().push(delay);
        tokio::task::yield_now().await;
    }
}
