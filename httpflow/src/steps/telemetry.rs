//! Start/stop telemetry steps: the only steps that talk to an [`EventSink`].

use super::{RequestFlow, RequestPhase, ResponseFlow, ResponsePhase, StepArgs, StepHandler, StepResult};
use crate::core::{Exchange, Request};
use crate::events::{get_event_sink, EventSink, TelemetryEvent, REQUEST_START, REQUEST_STOP};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

fn base_event(name: &str, request: &Request) -> TelemetryEvent {
    TelemetryEvent::new(name)
        .with_metadata("adapter", request.adapter_name())
        .with_metadata("method", request.method.as_str())
        .with_metadata("url", request.url.as_str())
        .with_metadata("attempt", request.private.retry_count)
}

/// Stamps the attempt start and emits `http.request.start`.
#[derive(Debug, Clone)]
pub struct LogRequestStart {
    sink: Arc<dyn EventSink>,
}

impl LogRequestStart {
    /// Emits into `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl Default for LogRequestStart {
    fn default() -> Self {
        Self::new(get_event_sink())
    }
}

#[async_trait]
impl StepHandler<RequestPhase> for LogRequestStart {
    fn name(&self) -> &str {
        "log_request_start"
    }

    async fn run(&self, mut request: Request, _args: StepArgs<'_>) -> StepResult<RequestFlow> {
        request.private.started_at = Some(Instant::now());

        let headers: Map<String, Value> = request
            .headers
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.encode())))
            .collect();
        let event = base_event(REQUEST_START, &request)
            .with_measurement("system_time_ms", chrono::Utc::now().timestamp_millis())
            .with_metadata("headers", headers);
        self.sink.emit(event).await;

        Ok(RequestFlow::Continue(request))
    }
}

/// Emits `http.request.stop` with the elapsed time and the outcome.
///
/// An attempt that was retried never reaches this step, so exactly one stop
/// event is emitted per logical call.
#[derive(Debug, Clone)]
pub struct LogResponseEnd {
    sink: Arc<dyn EventSink>,
}

impl LogResponseEnd {
    /// Emits into `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl Default for LogResponseEnd {
    fn default() -> Self {
        Self::new(get_event_sink())
    }
}

#[async_trait]
impl StepHandler<ResponsePhase> for LogResponseEnd {
    fn name(&self) -> &str {
        "log_response_end"
    }

    async fn run(&self, exchange: Exchange, _args: StepArgs<'_>) -> StepResult<ResponseFlow> {
        let mut event = base_event(REQUEST_STOP, &exchange.request);
        if let Some(started_at) = exchange.request.private.started_at {
            let millis = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
            event = event.with_measurement("duration_ms", millis);
        }
        event = match &exchange.outcome {
            Ok(response) => event.with_metadata("status", response.status),
            Err(error) => event
                .with_metadata("error", error.to_string())
                .with_metadata("error_kind", error.kind.to_string()),
        };
        self.sink.emit(event).await;

        Ok(ResponseFlow::Continue(exchange))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Method, RequestOptions, Response};
    use crate::errors::TransportError;
    use crate::events::CollectingEventSink;
    use crate::steps::{invoke, Step};
    use crate::testing::MockAdapter;
    use serde_json::json;

    fn request() -> Request {
        Request::build(
            Arc::new(MockAdapter::new()),
            Method::Post,
            "http://localhost/items?page=2",
            RequestOptions::default(),
        )
        .unwrap()
        .with_header("content-type", "application/json")
    }

    #[tokio::test]
    async fn test_start_event_and_marker() {
        let sink = Arc::new(CollectingEventSink::new());
        let step = Step::<RequestPhase>::handler(LogRequestStart::new(sink.clone()));

        let RequestFlow::Continue(request) = invoke(&step, request()).await.unwrap() else {
            panic!("start step must continue");
        };
        assert!(request.private.started_at.is_some());

        let events = sink.events_named(REQUEST_START);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.metadata("adapter"), Some(&json!("mock")));
        assert_eq!(event.metadata("method"), Some(&json!("POST")));
        assert_eq!(event.metadata("url"), Some(&json!("http://localhost/items?page=2")));
        assert_eq!(event.metadata("attempt"), Some(&json!(0)));
        assert_eq!(
            event.metadata("headers"),
            Some(&json!({"content-type": "application/json"}))
        );
    }

    #[tokio::test]
    async fn test_stop_event_with_status() {
        let sink = Arc::new(CollectingEventSink::new());
        let mut req = request();
        req.private.started_at = Some(Instant::now());
        let exchange = Exchange::new(req, Ok(Response::new(201)));

        let step = Step::<ResponsePhase>::handler(LogResponseEnd::new(sink.clone()));
        let flow = invoke(&step, exchange).await.unwrap();
        assert!(matches!(flow, ResponseFlow::Continue(_)));

        let event = &sink.events_named(REQUEST_STOP)[0];
        assert_eq!(event.metadata("status"), Some(&json!(201)));
        assert!(event.measurement("duration_ms").is_some());
        assert!(event.metadata("error").is_none());
    }

    #[tokio::test]
    async fn test_stop_event_with_error() {
        let sink = Arc::new(CollectingEventSink::new());
        let exchange = Exchange::new(request(), Err(TransportError::timeout("read timed out")));

        LogResponseEnd::new(sink.clone())
            .run(exchange, StepArgs::None)
            .await
            .unwrap();

        let event = &sink.events_named(REQUEST_STOP)[0];
        assert_eq!(event.metadata("error_kind"), Some(&json!("timeout")));
        assert_eq!(event.metadata("error"), Some(&json!("timeout: read timed out")));
        // no start marker, no duration
        assert!(event.measurement("duration_ms").is_none());
    }
}
