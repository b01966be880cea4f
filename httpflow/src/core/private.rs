//! Per-invocation scratch state shared between steps.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Extension key holding the transport pool chosen for an attempt.
pub const TRANSPORT_POOL_KEY: &str = "httpflow.transport_pool";

/// Extension key holding the proxy URL of the chosen transport pool.
pub const PROXY_URL_KEY: &str = "httpflow.proxy_url";

/// Private context carried through every step of one logical call.
///
/// Never exposed to the caller as part of the request. The retry counter
/// survives re-entry of the pipeline; everything else is owned by the steps
/// that write it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrivateContext {
    /// Number of retries already performed for this call.
    pub retry_count: u32,
    /// Monotonic start marker of the current attempt.
    pub started_at: Option<Instant>,
    /// Retries the engine still allows after the current attempt.
    ///
    /// `None` outside an engine run, where nothing bounds the retry step.
    pub retries_left: Option<u32>,
    extensions: HashMap<String, Value>,
}

impl PrivateContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an extension value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.extensions.insert(key.into(), value);
    }

    /// Returns an extension value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// Returns an extension value as a string slice.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Whether the engine has room for another attempt.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.retries_left.map_or(true, |left| left > 0)
    }

    /// Removes an extension value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.extensions.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        let mut ctx = PrivateContext::new();
        ctx.insert(TRANSPORT_POOL_KEY, serde_json::json!("eu-proxy"));
        assert_eq!(ctx.get_str(TRANSPORT_POOL_KEY), Some("eu-proxy"));
        assert_eq!(ctx.retry_count, 0);

        ctx.remove(TRANSPORT_POOL_KEY);
        assert!(ctx.get(TRANSPORT_POOL_KEY).is_none());
    }

    #[test]
    fn test_retry_budget() {
        let mut ctx = PrivateContext::new();
        assert!(ctx.can_retry());
        ctx.retries_left = Some(1);
        assert!(ctx.can_retry());
        ctx.retries_left = Some(0);
        assert!(!ctx.can_retry());
    }
}
