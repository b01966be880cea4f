//! The response step that turns a retry decision into a re-run.

use super::{decide, RetryDecision, Sleeper, TokioSleeper};
use crate::core::Exchange;
use crate::steps::{ResponseFlow, ResponsePhase, StepArgs, StepHandler, StepResult};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Response step applying the request's retry policy.
///
/// On a retry decision it sleeps, increments the retry counter, halts the
/// current attempt and returns [`ResponseFlow::Retry`]. Any other decision
/// passes the exchange through unchanged, as does a retry decision once
/// the engine has no attempts left.
#[derive(Debug, Clone)]
pub struct RetryStep {
    sleeper: Arc<dyn Sleeper>,
}

impl RetryStep {
    /// Creates a retry step that waits with `sleeper`.
    #[must_use]
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self { sleeper }
    }
}

impl Default for RetryStep {
    fn default() -> Self {
        Self::new(Arc::new(TokioSleeper))
    }
}

fn log_retry(exchange: &Exchange, delay: Duration, remaining: Option<u32>) {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let url = exchange.request.url.as_str();
    match (&exchange.outcome, remaining) {
        (Err(error), Some(left)) => warn!(
            url, error = %error, attempts_remaining = left,
            "Retry after exception, {left} attempt(s) remaining"
        ),
        (Err(error), None) => warn!(
            url, error = %error, delay_ms,
            "Retry after exception, waiting {delay_ms}ms"
        ),
        (Ok(response), Some(left)) => warn!(
            url, status = response.status, attempts_remaining = left,
            "Retry after HTTP {}, {left} attempt(s) remaining", response.status
        ),
        (Ok(response), None) => warn!(
            url, status = response.status, delay_ms,
            "Retry after HTTP {}, waiting {delay_ms}ms", response.status
        ),
    }
}

#[async_trait]
impl StepHandler<ResponsePhase> for RetryStep {
    fn name(&self) -> &str {
        "retry"
    }

    async fn run(&self, mut exchange: Exchange, _args: StepArgs<'_>) -> StepResult<ResponseFlow> {
        let decision = decide(
            &exchange.request.options.retry,
            &exchange.request,
            &exchange.outcome,
            Utc::now(),
        );
        let RetryDecision::Retry { delay, remaining } = decision else {
            return Ok(ResponseFlow::Continue(exchange));
        };

        if !exchange.request.private.can_retry() {
            debug!(
                url = %exchange.request.url,
                retry_count = exchange.request.private.retry_count,
                "Attempt limit reached, keeping outcome"
            );
            return Ok(ResponseFlow::Continue(exchange));
        }

        log_retry(&exchange, delay, remaining);
        self.sleeper.sleep(delay).await;

        exchange.request.private.retry_count += 1;
        exchange.request.halt();
        Ok(ResponseFlow::Retry(exchange))
    }
}
