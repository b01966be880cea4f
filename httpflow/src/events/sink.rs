//! Event sink trait and implementations.

use super::TelemetryEvent;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, Level};

/// Receives telemetry events.
///
/// Sinks must never fail the pipeline: errors are logged and suppressed.
#[async_trait]
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Emits an event, possibly waiting on the sink.
    async fn emit(&self, event: TelemetryEvent);

    /// Emits an event without blocking.
    fn try_emit(&self, event: TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: TelemetryEvent) {}

    fn try_emit(&self, _event: TelemetryEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &TelemetryEvent) {
        let measurements = serde_json::Value::Object(event.measurements.clone());
        let metadata = serde_json::Value::Object(event.metadata.clone());
        if self.level == Level::DEBUG {
            debug!(
                event = %event.name,
                measurements = %measurements,
                metadata = %metadata,
                "Event: {}", event.name
            );
        } else {
            info!(
                event = %event.name,
                measurements = %measurements,
                metadata = %metadata,
                "Event: {}", event.name
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: TelemetryEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: TelemetryEvent) {
        self.log_event(&event);
    }
}

/// Keeps every event in memory; meant for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<TelemetryEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.read().clone()
    }

    /// Returns the events with the given name.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Drops all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: TelemetryEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: TelemetryEvent) {
        self.events.write().push(event);
    }
}
