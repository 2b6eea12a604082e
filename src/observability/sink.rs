//! Event sinks
//!
//! The balancer emits typed events through an `EventSink`; it never picks a
//! log destination itself. `LogSink` renders events as structured JSON log
//! lines, `MemorySink` retains them for inspection in tests, `NullSink`
//! discards them.

use super::events::Event;
use super::logger::{Logger, Severity};
use std::sync::Mutex;

/// One emitted event with its context fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// The typed event
    pub event: Event,
    /// Context fields (host, pool, reason, ...)
    pub fields: Vec<(String, String)>,
}

impl EventRecord {
    /// Create a record from an event and owned field pairs.
    pub fn new(event: Event, fields: Vec<(String, String)>) -> Self {
        Self { event, fields }
    }

    /// Look up a field value by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Receiver for balancer events.
pub trait EventSink: Send + Sync {
    /// Consume one event record.
    fn emit(&self, record: EventRecord);
}

/// Sink that renders events through the structured logger.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, record: EventRecord) {
        let severity = if record.event.is_degraded() {
            Severity::Warn
        } else {
            Severity::Info
        };
        let fields: Vec<(&str, &str)> = record
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        Logger::log(severity, record.event.as_str(), &fields);
    }
}

/// Sink that retains every event, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records emitted so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().expect("sink lock poisoned").clone()
    }

    /// Count records for one event type.
    pub fn count(&self, event: Event) -> usize {
        self.records
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|r| r.event == event)
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, record: EventRecord) {
        self.records.lock().expect("sink lock poisoned").push(record);
    }
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _record: EventRecord) {}
}
