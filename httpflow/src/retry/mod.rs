//! Retry and backoff controller.
//!
//! [`decide`] turns a [`RetryConfig`], the request and its outcome into a
//! [`RetryDecision`]. [`RetryStep`] applies that decision inside the response
//! phase: it sleeps, bumps the retry counter and asks the engine to re-run
//! the pipeline from the top.
//!
//! Delay priority, once the mode says the outcome is retryable:
//!
//! 1. `429` with a parseable `retry-after` uses that delay.
//! 2. `429` otherwise uses [`DEFAULT_RETRY_DELAY`].
//! 3. Exponential backoff: `initial * factor^count`, capped.
//! 4. Rate-limit backoff: `x-ratelimit-reset - now` when the budget is spent.
//! 5. Linear backoff: a fixed delay while `count < max_retries`.
//!
//! Every policy is bounded by `attempt_ceiling`.

mod config;
mod decision;
mod sleeper;
mod step;

pub use config::{BackoffStrategy, RetryCondition, RetryConfig, RetryMode};
pub use decision::{
    decide, exponential_delay, is_retryable, parse_retry_after, rate_limit_delay, RetryDecision,
    DEFAULT_RETRY_DELAY,
};
pub use sleeper::{Sleeper, TokioSleeper};
pub use step::RetryStep;
