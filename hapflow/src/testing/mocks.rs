//! Tool runners for testing.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ToolFailure;
use crate::tools::{ToolExit, ToolInvocation, ToolRunner};

/// Labels an invocation as `program subcommand`, or just `program` when the
/// first argument is a flag.
#[must_use]
pub fn invocation_label(invocation: &ToolInvocation) -> String {
    match invocation.subcommand() {
        Some(sub) if !sub.starts_with('-') => format!("{} {sub}", invocation.program),
        _ => invocation.program.clone(),
    }
}

/// A tool runner that records every invocation instead of running it.
///
/// By default every invocation succeeds without side effects. With
/// [`materializing`](Self::materializing) the runner writes each produced
/// file (containing the command line), so it can drive a filesystem store.
#[derive(Debug, Default)]
pub struct RecordingToolRunner {
    invocations: Mutex<Vec<ToolInvocation>>,
    fail_on: Option<String>,
    materialize: bool,
}

impl RecordingToolRunner {
    /// Creates a runner where every tool succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes invocations with the given label exit with status 1.
    #[must_use]
    pub fn failing_on(mut self, label: impl Into<String>) -> Self {
        self.fail_on = Some(label.into());
        self
    }

    /// Writes the produced file of every successful invocation.
    #[must_use]
    pub fn materializing(mut self) -> Self {
        self.materialize = true;
        self
    }

    /// Returns all recorded invocations, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().clone()
    }

    /// Returns the label of every recorded invocation, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.invocations.lock().iter().map(invocation_label).collect()
    }

    /// Returns the number of recorded invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }

    /// Forgets recorded invocations.
    pub fn reset(&self) {
        self.invocations.lock().clear();
    }
}

#[async_trait]
impl ToolRunner for RecordingToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolExit, ToolFailure> {
        self.invocations.lock().push(invocation.clone());

        if self.fail_on.as_deref() == Some(invocation_label(invocation).as_str()) {
            return Ok(ToolExit::with_code(1));
        }

        if self.materialize {
            if let Some(path) = &invocation.produces {
                std::fs::write(path, format!("{invocation}\n"))
                    .map_err(|e| ToolFailure::launch(&invocation.program, e.to_string()))?;
            }
        }

        Ok(ToolExit::success())
    }
}
