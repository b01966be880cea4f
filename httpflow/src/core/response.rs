//! Responses, outcomes and the response-phase envelope.

use super::{Body, Headers, PrivateContext, Request};
use crate::errors::TransportError;
use url::Url;

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response headers in the order received.
    pub headers: Headers,
    /// Raw or decoded payload.
    pub body: Body,
    /// URL actually sent, including merged query parameters.
    pub request_url: Option<Url>,
    /// Mirror of the request's private context at dispatch time.
    pub private: PrivateContext,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Empty,
            request_url: None,
            private: PrivateContext::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns a header value, ignoring name case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_str(name)
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Either a response or a structured transport error.
pub type Outcome = Result<Response, TransportError>;

/// State of the response phase: the request plus what came back.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The request that produced the outcome.
    pub request: Request,
    /// Response- or error-shaped result.
    pub outcome: Outcome,
}

impl Exchange {
    /// Pairs a request with its outcome.
    #[must_use]
    pub fn new(request: Request, outcome: Outcome) -> Self {
        Self { request, outcome }
    }

    /// Returns the response, if the exchange succeeded.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.outcome.as_ref().ok()
    }

    /// Returns the response mutably, if the exchange succeeded.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.outcome.as_mut().ok()
    }

    /// Returns the transport error, if the exchange failed.
    #[must_use]
    pub fn error(&self) -> Option<&TransportError> {
        self.outcome.as_ref().err()
    }

    /// Returns the response status, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}
