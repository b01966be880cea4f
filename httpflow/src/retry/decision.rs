//! The retry decision table.

use super::{BackoffStrategy, RetryConfig, RetryMode};
use crate::core::{Outcome, Request, Response};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Delay used when a `429` or an exhausted rate limit carries no usable hint.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Attempts left under a counted policy, `None` otherwise.
        remaining: Option<u32>,
    },
    /// The policy is exhausted; keep the last outcome.
    GiveUp,
    /// The outcome is not retryable under the configured mode.
    NotRetryable,
}

impl RetryDecision {
    /// Returns true for [`RetryDecision::Retry`].
    #[must_use]
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

fn is_transient(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Returns true if `mode` allows retrying this outcome.
#[must_use]
pub fn is_retryable(mode: &RetryMode, request: &Request, outcome: &Outcome) -> bool {
    match mode {
        RetryMode::Never => false,
        RetryMode::Safe => match outcome {
            Ok(response) => request.method.is_safe() && is_transient(response.status),
            Err(_) => true,
        },
        RetryMode::Always => true,
        RetryMode::Custom(condition) => condition.matches(request, outcome),
    }
}

/// Decides whether and when to retry, given the current time.
#[must_use]
pub fn decide(
    config: &RetryConfig,
    request: &Request,
    outcome: &Outcome,
    now: DateTime<Utc>,
) -> RetryDecision {
    if !is_retryable(&config.mode, request, outcome) {
        return RetryDecision::NotRetryable;
    }

    let count = request.private.retry_count;
    if count >= config.attempt_ceiling {
        return RetryDecision::GiveUp;
    }

    if let Ok(response) = outcome {
        if response.status == 429 {
            let delay = response
                .header("retry-after")
                .and_then(|value| parse_retry_after(value, now))
                .unwrap_or(DEFAULT_RETRY_DELAY);
            return RetryDecision::Retry {
                delay,
                remaining: None,
            };
        }
    }

    match config.backoff {
        BackoffStrategy::Exponential => RetryDecision::Retry {
            delay: exponential_delay(config, count),
            remaining: None,
        },
        BackoffStrategy::RateLimit => RetryDecision::Retry {
            delay: outcome
                .as_ref()
                .map_or(DEFAULT_RETRY_DELAY, |response| rate_limit_delay(response, now)),
            remaining: None,
        },
        BackoffStrategy::Linear if count < config.max_retries => RetryDecision::Retry {
            delay: Duration::from_millis(config.delay_ms),
            remaining: Some(config.max_retries - count),
        },
        BackoffStrategy::Linear => RetryDecision::GiveUp,
    }
}

/// Parses a `retry-after` value: delta seconds or an HTTP date.
///
/// Dates in the past yield a zero delay.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(millis_until(at.with_timezone(&Utc), now))
}

/// Delay until `x-ratelimit-reset` once `x-ratelimit-remaining` is spent.
///
/// A missing, empty or `"0"` remaining count counts as spent. Without a
/// usable reset timestamp the default delay applies.
#[must_use]
pub fn rate_limit_delay(response: &Response, now: DateTime<Utc>) -> Duration {
    let spent = response
        .header("x-ratelimit-remaining")
        .map_or(true, |remaining| matches!(remaining.trim(), "" | "0"));
    let reset = response
        .header("x-ratelimit-reset")
        .and_then(|reset| reset.trim().parse::<i64>().ok())
        .and_then(|reset| DateTime::from_timestamp(reset, 0));

    match reset {
        Some(reset) if spent => millis_until(reset, now),
        _ => DEFAULT_RETRY_DELAY,
    }
}

/// `initial_delay_ms * factor^retry_count`, capped at `max_delay_ms`.
#[must_use]
pub fn exponential_delay(config: &RetryConfig, retry_count: u32) -> Duration {
    let delay = config
        .factor
        .checked_pow(retry_count)
        .and_then(|growth| config.initial_delay_ms.checked_mul(growth))
        .map_or(config.max_delay_ms, |delay| delay.min(config.max_delay_ms));
    Duration::from_millis(delay)
}

fn millis_until(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let millis = (at - now).num_milliseconds().max(0);
    Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Method, RequestOptions};
    use crate::errors::TransportError;
    use crate::testing::MockAdapter;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn request(method: Method, retry_count: u32) -> Request {
        let mut request = Request::build(
            Arc::new(MockAdapter::new()),
            method,
            "http://localhost/",
            RequestOptions::default(),
        )
        .unwrap();
        request.private.retry_count = retry_count;
        request
    }

    fn status(code: u16) -> Outcome {
        Ok(Response::new(code))
    }

    fn retry_after(delay_ms: u64, remaining: Option<u32>) -> RetryDecision {
        RetryDecision::Retry {
            delay: Duration::from_millis(delay_ms),
            remaining,
        }
    }

    #[test]
    fn test_safe_mode_applicability() {
        let mode = RetryMode::Safe;
        let get = request(Method::Get, 0);
        let head = request(Method::Head, 0);
        let post = request(Method::Post, 0);

        for code in [408, 429, 500, 503, 599] {
            assert!(is_retryable(&mode, &get, &status(code)), "GET {code}");
            assert!(is_retryable(&mode, &head, &status(code)), "HEAD {code}");
            assert!(!is_retryable(&mode, &post, &status(code)), "POST {code}");
        }
        for code in [200, 404, 600] {
            assert!(!is_retryable(&mode, &get, &status(code)), "GET {code}");
        }

        let refused = Err(TransportError::connection_refused("econnrefused"));
        assert!(is_retryable(&mode, &post, &refused));
    }

    #[test]
    fn test_never_always_and_custom_modes() {
        let get = request(Method::Get, 0);
        assert!(!is_retryable(&RetryMode::Never, &get, &status(503)));
        assert!(is_retryable(&RetryMode::Always, &request(Method::Post, 0), &status(200)));

        let default_condition = RetryMode::Custom(Default::default());
        assert!(is_retryable(&default_condition, &get, &status(500)));
        assert!(!is_retryable(&default_condition, &get, &status(499)));

        let only_404 = RetryConfig::when(|_, outcome| {
            outcome.as_ref().map(|r| r.status == 404).unwrap_or(false)
        });
        assert!(is_retryable(&only_404.mode, &get, &status(404)));
        assert!(!is_retryable(&only_404.mode, &get, &status(500)));
    }

    #[test]
    fn test_linear_counts_down_then_gives_up() {
        let config = RetryConfig::default();
        let outcome = status(500);

        assert_eq!(
            decide(&config, &request(Method::Get, 0), &outcome, now()),
            retry_after(2000, Some(2))
        );
        assert_eq!(
            decide(&config, &request(Method::Get, 1), &outcome, now()),
            retry_after(2000, Some(1))
        );
        assert_eq!(
            decide(&config, &request(Method::Get, 2), &outcome, now()),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_not_retryable_is_reported() {
        let decision = decide(
            &RetryConfig::default(),
            &request(Method::Post, 0),
            &status(500),
            now(),
        );
        assert_eq!(decision, RetryDecision::NotRetryable);
        assert!(!decision.is_retry());
    }

    #[test]
    fn test_retry_after_seconds_ignores_max_retries() {
        let config = RetryConfig::default().with_max_retries(0);
        let outcome = Ok(Response::new(429).with_header("Retry-After", "5"));
        assert_eq!(
            decide(&config, &request(Method::Get, 7), &outcome, now()),
            retry_after(5000, None)
        );
    }

    #[test]
    fn test_retry_after_http_date() {
        assert_eq!(
            parse_retry_after("Fri, 01 Mar 2024 12:00:30 GMT", now()),
            Some(Duration::from_secs(30))
        );
        // past dates clamp to zero
        assert_eq!(
            parse_retry_after("Fri, 01 Mar 2024 11:00:00 GMT", now()),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now()), None);
    }

    #[test]
    fn test_429_without_usable_retry_after() {
        let config = RetryConfig::default().with_max_retries(0);
        for response in [
            Response::new(429),
            Response::new(429).with_header("retry-after", "whenever"),
        ] {
            assert_eq!(
                decide(&config, &request(Method::Get, 3), &Ok(response), now()),
                RetryDecision::Retry {
                    delay: DEFAULT_RETRY_DELAY,
                    remaining: None
                }
            );
        }
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        let config = RetryConfig::default().with_backoff(BackoffStrategy::Exponential);
        assert_eq!(exponential_delay(&config, 0), Duration::from_millis(1000));
        assert_eq!(exponential_delay(&config, 1), Duration::from_millis(2000));
        assert_eq!(exponential_delay(&config, 3), Duration::from_millis(8000));
        assert_eq!(exponential_delay(&config, 11), Duration::from_millis(1_200_000));
        assert_eq!(exponential_delay(&config, 200), Duration::from_millis(1_200_000));

        // not bounded by max_retries
        assert_eq!(
            decide(&config, &request(Method::Get, 5), &status(502), now()),
            retry_after(32_000, None)
        );
    }

    #[test]
    fn test_rate_limit_delay() {
        let reset = (now().timestamp() + 42).to_string();

        let spent = Response::new(503)
            .with_header("x-ratelimit-remaining", "0")
            .with_header("x-ratelimit-reset", reset.as_str());
        assert_eq!(rate_limit_delay(&spent, now()), Duration::from_millis(42_000));

        let reset_only = Response::new(503).with_header("x-ratelimit-reset", reset.as_str());
        assert_eq!(rate_limit_delay(&reset_only, now()), Duration::from_millis(42_000));

        let budget_left = Response::new(503)
            .with_header("x-ratelimit-remaining", "10")
            .with_header("x-ratelimit-reset", reset.as_str());
        assert_eq!(rate_limit_delay(&budget_left, now()), DEFAULT_RETRY_DELAY);

        let no_headers = Response::new(503);
        assert_eq!(rate_limit_delay(&no_headers, now()), DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_rate_limit_policy_on_transport_error() {
        let config = RetryConfig::default().with_backoff(BackoffStrategy::RateLimit);
        let outcome = Err(TransportError::timeout("slow"));
        assert_eq!(
            decide(&config, &request(Method::Get, 9), &outcome, now()),
            RetryDecision::Retry {
                delay: DEFAULT_RETRY_DELAY,
                remaining: None
            }
        );
    }

    #[test]
    fn test_attempt_ceiling_bounds_every_policy() {
        let outcome = Ok(Response::new(429).with_header("retry-after", "1"));
        for backoff in [
            BackoffStrategy::Linear,
            BackoffStrategy::Exponential,
            BackoffStrategy::RateLimit,
        ] {
            let config = RetryConfig::always()
                .with_backoff(backoff)
                .with_attempt_ceiling(3);
            assert!(decide(&config, &request(Method::Get, 2), &outcome, now()).is_retry());
            assert_eq!(
                decide(&config, &request(Method::Get, 3), &outcome, now()),
                RetryDecision::GiveUp
            );
        }
    }
}
