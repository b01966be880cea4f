//! Retry policy configuration.

use crate::core::{Outcome, Request};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type ConditionFn = dyn Fn(&Request, &Outcome) -> bool + Send + Sync;

/// A caller predicate deciding whether an outcome is retryable.
#[derive(Clone)]
pub struct RetryCondition(Arc<ConditionFn>);

impl RetryCondition {
    /// Wraps a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request, &Outcome) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn matches(&self, request: &Request, outcome: &Outcome) -> bool {
        (self.0)(request, outcome)
    }
}

impl Default for RetryCondition {
    /// Retries transport errors and any status `>= 500`.
    fn default() -> Self {
        Self::new(|_, outcome| match outcome {
            Ok(response) => response.status >= 500,
            Err(_) => true,
        })
    }
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryCondition(..)")
    }
}

/// Which outcomes are retried at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    /// Never retry.
    Never,
    /// GET/HEAD on 408, 429 and 5xx; transport errors for any method.
    #[default]
    Safe,
    /// Every outcome.
    Always,
    /// Whatever the condition accepts.
    #[serde(skip)]
    Custom(RetryCondition),
}

/// How the delay before the next attempt is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed `delay_ms`, at most `max_retries` times.
    #[default]
    Linear,
    /// `initial_delay_ms * factor^retry_count`, capped at `max_delay_ms`.
    Exponential,
    /// Wait until `x-ratelimit-reset` once the budget is spent.
    RateLimit,
}

/// Retry policy of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Which outcomes are retried.
    pub mode: RetryMode,
    /// How delays are computed.
    pub backoff: BackoffStrategy,
    /// Linear delay in milliseconds.
    pub delay_ms: u64,
    /// Linear retry budget.
    pub max_retries: u32,
    /// First exponential delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Exponential growth factor.
    pub factor: u64,
    /// Exponential delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Hard limit on retries for every policy.
    pub attempt_ceiling: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            mode: RetryMode::Safe,
            backoff: BackoffStrategy::Linear,
            delay_ms: 2000,
            max_retries: 2,
            initial_delay_ms: 1000,
            factor: 2,
            max_delay_ms: 1_200_000,
            attempt_ceiling: 16,
        }
    }
}

impl RetryConfig {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn never() -> Self {
        Self::new().with_mode(RetryMode::Never)
    }

    /// A policy that retries every outcome.
    #[must_use]
    pub fn always() -> Self {
        Self::new().with_mode(RetryMode::Always)
    }

    /// A policy that retries whatever `condition` accepts.
    #[must_use]
    pub fn when<F>(condition: F) -> Self
    where
        F: Fn(&Request, &Outcome) -> bool + Send + Sync + 'static,
    {
        Self::new().with_mode(RetryMode::Custom(RetryCondition::new(condition)))
    }

    /// Sets the mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RetryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the linear delay.
    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Sets the linear retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the first exponential delay.
    #[must_use]
    pub fn with_initial_delay_ms(mut self, initial_delay_ms: u64) -> Self {
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    /// Sets the exponential factor.
    #[must_use]
    pub fn with_factor(mut self, factor: u64) -> Self {
        self.factor = factor;
        self
    }

    /// Sets the exponential cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Sets the hard retry limit.
    #[must_use]
    pub fn with_attempt_ceiling(mut self, attempt_ceiling: u32) -> Self {
        self.attempt_ceiling = attempt_ceiling;
        self
    }
}
