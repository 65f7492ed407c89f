//! Pipeline lifecycle events.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted while the pipeline runs.
///
/// Events are consumed by event sinks for logging or by tests that assert on
/// the order in which stages ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (e.g., "stage.started", "stage.reused").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (RFC 3339, UTC).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a data field as a string, if present.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    /// Converts the event to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.event_type));
        map.insert("timestamp".to_string(), serde_json::json!(self.timestamp));

        if !self.data.is_empty() {
            let data_map: serde_json::Map<String, serde_json::Value> =
                self.data.clone().into_iter().collect();
            map.insert("data".to_string(), serde_json::Value::Object(data_map));
        }

        map
    }

    /// Creates a "pipeline.started" event.
    #[must_use]
    pub fn pipeline_started(run_id: &str, output_dir: &str) -> Self {
        Self::new("pipeline.started")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("output_dir", serde_json::json!(output_dir))
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn pipeline_completed(run_id: &str, executed: usize, reused: usize, duration_ms: f64) -> Self {
        Self::new("pipeline.completed")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("executed", serde_json::json!(executed))
            .add_data("reused", serde_json::json!(reused))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "pipeline.failed" event carrying the error dictionary.
    #[must_use]
    pub fn pipeline_failed(run_id: &str, error: HashMap<String, serde_json::Value>) -> Self {
        let error: serde_json::Map<String, serde_json::Value> = error.into_iter().collect();
        Self::new("pipeline.failed")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("error", serde_json::Value::Object(error))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(stage_name: &str, output: &str) -> Self {
        Self::new("stage.started")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("output", serde_json::json!(output))
    }

    /// Creates a "stage.reused" event for a stage whose output already exists.
    #[must_use]
    pub fn stage_reused(stage_name: &str, output: &str) -> Self {
        Self::new("stage.reused")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("output", serde_json::json!(output))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn stage_completed(stage_name: &str, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(stage_name: &str, error: HashMap<String, serde_json::Value>) -> Self {
        let error: serde_json::Map<String, serde_json::Value> = error.into_iter().collect();
        Self::new("stage.failed")
            .add_data("stage", serde_json::json!(stage_name))
            .add_data("error", serde_json::Value::Object(error))
    }

    /// Creates a "cleanup.completed" event.
    #[must_use]
    pub fn cleanup_completed(removed: usize) -> Self {
        Self::new("cleanup.completed").add_data("removed", serde_json::json!(removed))
    }
}
