//! Event sink system for observability.
//!
//! The driver and stage runner report lifecycle events through an injected
//! [`EventSink`]; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
