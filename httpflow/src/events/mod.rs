//! Telemetry boundary.
//!
//! Steps that observe an attempt (`log_request_start`, `log_response_end`)
//! hand a [`TelemetryEvent`] to an [`EventSink`]. Nothing else in the crate
//! talks to a sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Name of the event fired before dispatch.
pub const REQUEST_START: &str = "http.request.start";

/// Name of the event fired once an attempt completes.
pub const REQUEST_STOP: &str = "http.request.stop";

/// A named event with numeric measurements and a metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    /// Event name, e.g. `http.request.start`.
    pub name: String,
    /// Numeric measurements such as `duration_ms`.
    pub measurements: Map<String, Value>,
    /// Correlation data: adapter, method, url and so on.
    pub metadata: Map<String, Value>,
}

impl TelemetryEvent {
    /// Creates an event with no data.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measurements: Map::new(),
            metadata: Map::new(),
        }
    }

    /// Adds a measurement.
    #[must_use]
    pub fn with_measurement(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.measurements.insert(key.into(), value.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a measurement.
    #[must_use]
    pub fn measurement(&self, key: &str) -> Option<&Value> {
        self.measurements.get(key)
    }

    /// Returns a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the process-wide event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the process-wide event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Gets the process-wide event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}
