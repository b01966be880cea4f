//! Adapter backed by `reqwest`.

use super::{Adapter, DEFAULT_POOL};
use crate::core::{Body, Request, Response, PROXY_URL_KEY, TIMEOUT_MS_OPTION, TRANSPORT_POOL_KEY};
use crate::errors::{TransportError, TransportErrorKind};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;

/// Connection-pooled adapter.
///
/// Keeps one `reqwest::Client` per transport pool identity, created on first
/// use. Concurrent first use of the same identity resolves to a single pool.
#[derive(Debug, Default)]
pub struct ReqwestAdapter {
    pools: DashMap<String, reqwest::Client>,
    default_timeout: Option<Duration>,
}

impl ReqwestAdapter {
    /// Creates an adapter with no pools yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a timeout to requests that carry none of their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Returns the number of pools created so far.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    fn pool(&self, request: &Request) -> Result<reqwest::Client, TransportError> {
        let name = request
            .private
            .get_str(TRANSPORT_POOL_KEY)
            .unwrap_or(DEFAULT_POOL);
        if let Some(client) = self.pools.get(name) {
            return Ok(client.clone());
        }

        match self.pools.entry(name.to_string()) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                let mut builder = reqwest::Client::builder();
                if let Some(proxy_url) = request.private.get_str(PROXY_URL_KEY) {
                    let proxy = reqwest::Proxy::all(proxy_url)
                        .map_err(|e| TransportError::new(TransportErrorKind::Proxy, e.to_string()))?;
                    builder = builder.proxy(proxy);
                }
                let client = builder
                    .build()
                    .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
                tracing::debug!(pool = name, "Created transport pool");
                Ok(slot.insert(client).clone())
            }
        }
    }

    fn timeout(&self, request: &Request) -> Option<Duration> {
        request
            .options
            .adapter_options
            .get(TIMEOUT_MS_OPTION)
            .and_then(serde_json::Value::as_u64)
            .map(Duration::from_millis)
            .or(self.default_timeout)
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::ConnectionRefused
    } else if err.is_request() || err.is_body() || err.is_decode() || err.is_redirect() {
        TransportErrorKind::Protocol
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}

fn wire_body(body: &Body) -> Result<Vec<u8>, TransportError> {
    match body {
        Body::Empty => Ok(Vec::new()),
        Body::Bytes(bytes) => Ok(bytes.clone()),
        Body::Json(value) => serde_json::to_vec(value)
            .map_err(|e| TransportError::protocol(format!("unencodable body: {e}"))),
        Body::Form(_) => Err(TransportError::protocol(
            "form body reached the adapter without encoding",
        )),
    }
}

#[async_trait]
impl Adapter for ReqwestAdapter {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn call(&self, request: &Request) -> Result<Response, TransportError> {
        let client = self.pool(request)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::protocol(e.to_string()))?;

        let mut builder = client.request(method, request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value.encode());
        }
        let body = wire_body(&request.body)?;
        if !body.is_empty() {
            builder = builder.body(body);
        }
        if let Some(timeout) = self.timeout(request) {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let request_url = response.url().clone();
        let bytes = response.bytes().await.map_err(|e| classify(&e))?;

        Ok(Response {
            status,
            headers,
            body: Body::Bytes(bytes.to_vec()),
            request_url: Some(request_url),
            private: request.private.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Method, RequestOptions};
    use std::sync::Arc;

    fn request(options: RequestOptions) -> Request {
        Request::build(
            Arc::new(ReqwestAdapter::new()),
            Method::Get,
            "http://127.0.0.1:9/",
            options,
        )
        .unwrap()
    }

    #[test]
    fn test_pool_is_created_once() {
        let adapter = ReqwestAdapter::new();
        let req = request(RequestOptions::default());
        adapter.pool(&req).unwrap();
        adapter.pool(&req).unwrap();
        assert_eq!(adapter.pool_count(), 1);
    }

    #[test]
    fn test_concurrent_first_use_creates_one_pool() {
        let adapter = ReqwestAdapter::new();
        let barrier = std::sync::Barrier::new(8);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let mut req = request(RequestOptions::default());
                    req.private
                        .insert(TRANSPORT_POOL_KEY, serde_json::json!("shared"));
                    barrier.wait();
                    adapter.pool(&req).unwrap();
                });
            }
        });

        assert_eq!(adapter.pool_count(), 1);
    }

    #[test]
    fn test_named_pool_per_proxy() {
        let adapter = ReqwestAdapter::new();
        let mut req = request(RequestOptions::default());
        adapter.pool(&req).unwrap();

        req.private
            .insert(TRANSPORT_POOL_KEY, serde_json::json!("corp"));
        req.private
            .insert(PROXY_URL_KEY, serde_json::json!("http://proxy.local:3128"));
        adapter.pool(&req).unwrap();
        assert_eq!(adapter.pool_count(), 2);
    }

    #[test]
    fn test_timeout_option() {
        let adapter = ReqwestAdapter::new().with_default_timeout(Duration::from_secs(30));
        let req = request(RequestOptions::new().timeout(Duration::from_millis(250)));
        assert_eq!(adapter.timeout(&req), Some(Duration::from_millis(250)));

        let req = request(RequestOptions::default());
        assert_eq!(adapter.timeout(&req), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_unencoded_form_is_rejected() {
        let err = wire_body(&Body::form([("a", "1")])).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Protocol);
    }
}
