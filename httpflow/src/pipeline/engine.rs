//! The step-folding engine.

use crate::adapter::dispatch;
use crate::core::{Exchange, Outcome, Request};
use crate::errors::HttpflowError;
use crate::steps::{invoke, Phase, RequestFlow, RequestPhase, ResponseFlow, ResponsePhase};
use tracing::{debug, warn};

/// Absolute limit on attempts per call, whatever the retry policy says.
pub const MAX_ATTEMPTS: u32 = 64;

/// How the request phase ended.
enum RequestEnd {
    Dispatched(Exchange),
    Halted(Exchange),
}

/// How one attempt ended.
enum AttemptEnd {
    Done(Exchange),
    Retry(Exchange),
}

/// Runs requests through their step lists.
///
/// An attempt folds the request steps until one dispatches (the adapter
/// step) or halts, then folds the response steps over the exchange. A
/// response step returning [`ResponseFlow::Retry`] starts a new attempt from
/// the caller's request, carrying the private context forward.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    max_attempts: u32,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl Pipeline {
    /// Creates an engine with the default attempt limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the attempt limit; values below one are raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the attempt limit.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs the request to completion.
    ///
    /// The outer error is a fatal step failure; the inner result is the
    /// response or the transport error of the last attempt.
    pub async fn run(&self, request: Request) -> Result<Outcome, HttpflowError> {
        let mut private = request.private.clone();
        let mut attempt = 1;

        loop {
            let mut fresh = request.clone();
            fresh.private = private;
            fresh.private.retries_left = Some(self.max_attempts.saturating_sub(attempt));
            debug!(
                method = %fresh.method,
                url = %fresh.url,
                attempt,
                retry_count = fresh.private.retry_count,
                "Starting attempt"
            );

            match run_attempt(fresh).await? {
                AttemptEnd::Done(exchange) => return Ok(exchange.outcome),
                AttemptEnd::Retry(exchange) if attempt >= self.max_attempts => {
                    warn!(
                        url = %exchange.request.url,
                        attempts = attempt,
                        "Attempt limit reached, returning last outcome"
                    );
                    return Ok(exchange.outcome);
                }
                AttemptEnd::Retry(exchange) => {
                    private = exchange.request.private;
                    attempt += 1;
                }
            }
        }
    }
}

/// Runs a request with the default engine.
pub async fn run(request: Request) -> Result<Outcome, HttpflowError> {
    Pipeline::default().run(request).await
}

async fn run_attempt(request: Request) -> Result<AttemptEnd, HttpflowError> {
    match run_request_phase(request).await? {
        RequestEnd::Dispatched(exchange) => run_response_phase(exchange).await,
        RequestEnd::Halted(exchange) => Ok(AttemptEnd::Done(exchange)),
    }
}

async fn run_request_phase(mut request: Request) -> Result<RequestEnd, HttpflowError> {
    let steps = request.request_steps.clone();
    for step in &steps {
        debug!(step = step.name(), phase = RequestPhase::NAME, "Running step");
        match invoke(step, request).await? {
            RequestFlow::Continue(next) => request = next,
            RequestFlow::Dispatched(exchange) => return Ok(RequestEnd::Dispatched(exchange)),
            RequestFlow::Halt(mut exchange) => {
                debug!(step = step.name(), phase = RequestPhase::NAME, "Step halted");
                exchange.request.halt();
                return Ok(RequestEnd::Halted(exchange));
            }
        }
    }

    debug!(url = %request.url, "No step dispatched, calling adapter");
    Ok(RequestEnd::Dispatched(dispatch(request).await))
}

async fn run_response_phase(mut exchange: Exchange) -> Result<AttemptEnd, HttpflowError> {
    let steps = exchange.request.response_steps.clone();
    for step in &steps {
        debug!(step = step.name(), phase = ResponsePhase::NAME, "Running step");
        match invoke(step, exchange).await? {
            ResponseFlow::Continue(next) => exchange = next,
            ResponseFlow::Halt(mut next) => {
                debug!(step = step.name(), phase = ResponsePhase::NAME, "Step halted");
                next.request.halt();
                return Ok(AttemptEnd::Done(next));
            }
            ResponseFlow::Retry(next) => return Ok(AttemptEnd::Retry(next)),
        }
    }
    Ok(AttemptEnd::Done(exchange))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Method, RequestOptions, Response};
    use crate::errors::TransportError;
    use crate::steps::{AdapterStep, Step};
    use crate::testing::MockAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn request(adapter: Arc<MockAdapter>) -> Request {
        Request::build(adapter, Method::Get, "http://localhost/", RequestOptions::default())
            .unwrap()
    }

    fn counting_response_step(counter: Arc<AtomicUsize>) -> Step<ResponsePhase> {
        Step::sync("count", move |exchange: Exchange| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ResponseFlow::Continue(exchange))
        })
    }

    #[tokio::test]
    async fn test_implicit_adapter_dispatch() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.push_response(Response::new(201));

        let outcome = run(request(adapter.clone())).await.unwrap();
        assert_eq!(outcome.unwrap().status, 201);
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_steps_after_adapter_step_are_skipped() {
        let adapter = Arc::new(MockAdapter::new());
        let req = request(adapter.clone()).append_request_steps([
            Step::handler(AdapterStep),
            Step::sync("never", |_req: Request| -> Result<RequestFlow, HttpflowError> {
                panic!("request steps after dispatch must not run")
            }),
        ]);

        run(req).await.unwrap().unwrap();
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_request_halt_skips_dispatch_and_response_phase() {
        let adapter = Arc::new(MockAdapter::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let req = request(adapter.clone())
            .append_request_steps([Step::sync("cache", |req: Request| {
                Ok(RequestFlow::Halt(Exchange::new(req, Ok(Response::new(304)))))
            })])
            .append_response_steps([counting_response_step(counter.clone())]);

        let outcome = run(req).await.unwrap();
        assert_eq!(outcome.unwrap().status, 304);
        assert_eq!(adapter.call_count(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_response_halt_stops_fold() {
        let adapter = Arc::new(MockAdapter::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let req = request(adapter).append_response_steps([
            counting_response_step(counter.clone()),
            Step::sync("stop", |exchange: Exchange| Ok(ResponseFlow::Halt(exchange))),
            counting_response_step(counter.clone()),
        ]);

        run(req).await.unwrap().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_flows_through_response_phase() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.push_error(TransportError::connection_refused("econnrefused"));
        let req = request(adapter).append_response_steps([Step::sync(
            "recover",
            |mut exchange: Exchange| {
                if exchange.error().is_some() {
                    exchange.outcome = Ok(Response::new(203));
                }
                Ok(ResponseFlow::Continue(exchange))
            },
        )]);

        assert_eq!(run(req).await.unwrap().unwrap().status, 203);
    }

    #[tokio::test]
    async fn test_step_failure_is_fatal() {
        let adapter = Arc::new(MockAdapter::new());
        let req = request(adapter.clone()).append_request_steps([Step::sync(
            "broken",
            |_req: Request| Err(HttpflowError::step_contract("broken", "bad shape")),
        )]);

        let err = run(req).await.unwrap_err();
        assert!(matches!(err, HttpflowError::StepContract { .. }));
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_signal_reruns_from_pristine_request() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.push_statuses(&[500, 500, 200]);
        let req = request(adapter.clone())
            .append_request_steps([Step::sync("mark", |mut req: Request| {
                req.headers.push("x-mark", "1");
                Ok(RequestFlow::Continue(req))
            })])
            .append_response_steps([Step::sync("retry_5xx", |mut exchange: Exchange| {
                if exchange.status() == Some(500) {
                    exchange.request.private.retry_count += 1;
                    return Ok(ResponseFlow::Retry(exchange));
                }
                Ok(ResponseFlow::Continue(exchange))
            })]);

        assert_eq!(run(req).await.unwrap().unwrap().status, 200);

        let seen = adapter.requests();
        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen.iter().map(|r| r.retry_count).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        // each attempt starts from the caller's request, so steps apply once
        assert!(seen.iter().all(|r| r.headers.len() == 1));
    }

    #[tokio::test]
    async fn test_absolute_attempt_limit() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.push_response(Response::new(503));
        let req = request(adapter.clone()).append_response_steps([Step::sync(
            "retry_forever",
            |exchange: Exchange| Ok(ResponseFlow::Retry(exchange)),
        )]);

        let outcome = Pipeline::new().with_max_attempts(5).run(req).await.unwrap();
        assert_eq!(outcome.unwrap().status, 503);
        assert_eq!(adapter.call_count(), 5);
    }

    #[tokio::test]
    async fn test_remaining_budget_is_visible_to_steps() {
        let adapter = Arc::new(MockAdapter::new());
        adapter.push_response(Response::new(503));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let record = seen.clone();
        let req = request(adapter).append_response_steps([Step::sync(
            "retry_while_allowed",
            move |exchange: Exchange| {
                record.lock().push(exchange.request.private.retries_left);
                if exchange.request.private.can_retry() {
                    return Ok(ResponseFlow::Retry(exchange));
                }
                Ok(ResponseFlow::Continue(exchange))
            },
        )]);

        Pipeline::new().with_max_attempts(3).run(req).await.unwrap().unwrap();
        assert_eq!(*seen.lock(), vec![Some(2), Some(1), Some(0)]);
    }
}
