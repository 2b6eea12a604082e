//! Observability
//!
//! Typed events, event sinks, a structured JSON logger, and counter
//! metrics. The routing core only emits events; sinks decide rendering.

mod events;
mod logger;
mod metrics;
mod sink;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::MetricsRegistry;
pub use sink::{EventRecord, EventSink, LogSink, MemorySink, NullSink};
