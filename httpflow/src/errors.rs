//! Error types for the httpflow pipeline.
//!
//! Two failure channels are kept apart:
//! [`TransportError`] is the structured, handled failure an adapter reports
//! and flows through the response phase like any response, while
//! [`HttpflowError`] covers the loud failures that indicate a programming or
//! configuration defect and abort the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal pipeline failures.
///
/// These are never retried and never converted into a handled
/// [`TransportError`].
#[derive(Debug, Error)]
pub enum HttpflowError {
    /// A step was misconfigured or could not be resolved.
    #[error("Step contract violation in `{step}`: {message}")]
    StepContract {
        /// Name of the offending step.
        step: String,
        /// What went wrong.
        message: String,
    },

    /// A `content-encoding` token the pipeline cannot undo.
    #[error("Unsupported content-encoding: {0}")]
    UnsupportedEncoding(String),

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A request body could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),

    /// The request URL could not be parsed or resolved.
    #[error("Invalid URL `{url}`: {source}")]
    InvalidUrl {
        /// The raw URL that failed.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpflowError {
    /// Creates a step contract violation.
    #[must_use]
    pub fn step_contract(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepContract {
            step: step.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for HttpflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The remote end refused or could not be reached.
    ConnectionRefused,
    /// The exchange did not complete in time.
    Timeout,
    /// TLS negotiation failed.
    Tls,
    /// The configured proxy failed.
    Proxy,
    /// The peer violated the HTTP protocol or sent an unreadable message.
    Protocol,
    /// The connection was closed mid-exchange.
    Closed,
    /// Anything the adapter could not classify.
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::Tls => "tls",
            Self::Proxy => "proxy",
            Self::Protocol => "protocol",
            Self::Closed => "closed",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Structured failure reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Failure category, suitable for matching.
    pub kind: TransportErrorKind,
    /// Human-readable detail from the transport.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a refused connection.
    #[must_use]
    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectionRefused, message)
    }

    /// Shorthand for a timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Shorthand for a protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }
}
