//! The transport boundary.
//!
//! An [`Adapter`] performs exactly one request/response exchange and reports
//! failures as a structured [`TransportError`]. The pipeline never looks
//! inside it. Adapters are shared between concurrent calls, so they must be
//! `Send + Sync`.

#[cfg(feature = "reqwest")]
mod reqwest_adapter;

#[cfg(feature = "reqwest")]
pub use reqwest_adapter::ReqwestAdapter;

use crate::core::{Exchange, Request, Response};
use crate::errors::TransportError;
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

/// Pool identity used when no proxy step picked one.
pub const DEFAULT_POOL: &str = "default";

/// A transport capable of a single HTTP exchange.
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// Identity reported in telemetry.
    fn name(&self) -> &str;

    /// Performs the exchange for a finalized request.
    async fn call(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Runs the request's adapter and pairs the request with the outcome.
///
/// The response is stamped with the URL actually sent and a copy of the
/// private context.
pub async fn dispatch(request: Request) -> Exchange {
    debug!(
        adapter = request.adapter_name(),
        method = %request.method,
        url = %request.url,
        "Dispatching request"
    );
    let outcome = request.adapter.call(&request).await.map(|mut response| {
        if response.request_url.is_none() {
            response.request_url = Some(request.url.clone());
        }
        response.private = request.private.clone();
        response
    });
    Exchange::new(request, outcome)
}
