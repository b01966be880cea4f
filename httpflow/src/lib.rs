//! # Httpflow
//!
//! A pluggable HTTP request pipeline: an ordered, extensible chain of steps
//! wrapped around a swappable transport.
//!
//! Httpflow provides:
//!
//! - **Steps**: closures or named handlers folded over the request, then over
//!   the response or transport error
//! - **Halt and retry signals**: steps stop a phase or re-run the pipeline by
//!   returning a typed signal
//! - **Retry policies**: safe, always, never or a custom condition, with
//!   linear, exponential or rate-limit aware backoff
//! - **Adapters**: any `Send + Sync` transport; a reqwest adapter ships by
//!   default
//! - **Telemetry**: start/stop events through a pluggable sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use httpflow::prelude::*;
//!
//! let client = Client::builder(Arc::new(ReqwestAdapter::new()))
//!     .with_base_url("https://api.example.com/v1/")
//!     .with_retry(RetryConfig::default().with_max_retries(3))
//!     .build()?;
//!
//! match client.get("users/7").await? {
//!     Ok(response) => println!("{} {:?}", response.status, response.body),
//!     Err(error) => eprintln!("transport failed: {error}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapter;
pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod retry;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::Adapter;
    #[cfg(feature = "reqwest")]
    pub use crate::adapter::ReqwestAdapter;
    pub use crate::client::{Client, ClientBuilder};
    pub use crate::config::ClientConfig;
    pub use crate::core::{
        Auth, Body, Exchange, HeaderValue, Headers, Method, Outcome, Request, RequestOptions,
        Response,
    };
    pub use crate::errors::{HttpflowError, TransportError, TransportErrorKind};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, TelemetryEvent};
    pub use crate::pipeline::Pipeline;
    pub use crate::retry::{BackoffStrategy, RetryConfig, RetryMode, Sleeper};
    pub use crate::steps::{
        RequestFlow, RequestPhase, ResponseFlow, ResponsePhase, Step, StepArgs, StepHandler,
        StepRegistry,
    };
    pub use std::sync::Arc;
}
