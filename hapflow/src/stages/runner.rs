//! Executing a stage against the checkpoint store.

use super::Stage;
use crate::core::{PipelineEvent, StageKind, StageStatus};
use crate::errors::{HapflowError, Result};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::store::{ArtifactStore, Producer};
use crate::tools::{ToolRunner, ToolSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// The stage name.
    pub stage: String,
    /// The operation performed.
    pub kind: StageKind,
    /// The declared output artifact.
    pub output: String,
    /// `Completed` if the tool ran, `Reused` if the output already existed.
    pub status: StageStatus,
    /// Wall-clock time spent, in milliseconds.
    pub duration_ms: f64,
}

/// Runs stages one at a time: precondition check, checkpoint decision, tool
/// invocation, then the follow-up index.
///
/// The runner remembers which artifacts it produced. A stage with any such
/// input runs again even if its output exists, so a re-executed stage
/// invalidates everything computed from it.
pub struct StageRunner {
    store: Arc<dyn ArtifactStore>,
    tools: Arc<dyn ToolRunner>,
    tool_set: ToolSet,
    events: Arc<dyn EventSink>,
    fresh: HashSet<String>,
}

impl StageRunner {
    /// Creates a runner with no event sink.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>, tools: Arc<dyn ToolRunner>, tool_set: ToolSet) -> Self {
        Self {
            store,
            tools,
            tool_set,
            events: Arc::new(NoOpEventSink),
            fresh: HashSet::new(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns true if the artifact was written by this runner.
    #[must_use]
    pub fn is_fresh(&self, name: &str) -> bool {
        self.fresh.contains(name)
    }

    /// Runs `stage` and, if its output carries a companion, the index stage.
    pub async fn run(&mut self, stage: &Stage) -> Result<Vec<StageOutcome>> {
        let mut outcomes = vec![self.run_one(stage).await?];
        if let Some(index) = stage.follow_up_index() {
            outcomes.push(self.run_one(&index).await?);
        }
        Ok(outcomes)
    }

    #[tracing::instrument(name = "stage", skip_all, fields(stage = %stage.name, kind = %stage.kind))]
    async fn run_one(&mut self, stage: &Stage) -> Result<StageOutcome> {
        let timer = SpanTimer::start(&stage.name);

        if let Err(err) = self.check_preconditions(stage) {
            self.events
                .emit(&PipelineEvent::stage_failed(&stage.name, err.to_dict()))
                .await;
            return Err(err);
        }

        let output = &stage.output.name;
        let stale = stage.inputs.iter().any(|input| self.fresh.contains(&input.name));

        if self.store.exists(output) && !stale {
            info!(
                "Not running {} as {} exists.",
                stage.name,
                self.store.path(output).display()
            );
            self.events
                .emit(&PipelineEvent::stage_reused(&stage.name, output))
                .await;
            return Ok(self.outcome(stage, StageStatus::Reused, timer.finish()));
        }

        if stale && self.store.exists(output) {
            debug!(output = %output, "Recomputing output of a re-executed input");
        }

        self.events
            .emit(&PipelineEvent::stage_started(&stage.name, output))
            .await;

        if let Err(err) = self.execute(stage).await {
            self.events
                .emit(&PipelineEvent::stage_failed(&stage.name, err.to_dict()))
                .await;
            return Err(err);
        }

        self.fresh.insert(output.clone());
        let duration_ms = timer.finish();
        self.events
            .emit(&PipelineEvent::stage_completed(&stage.name, duration_ms))
            .await;
        Ok(self.outcome(stage, StageStatus::Completed, duration_ms))
    }

    fn check_preconditions(&self, stage: &Stage) -> Result<()> {
        match stage
            .required_artifacts()
            .into_iter()
            .find(|artifact| !self.store.exists(&artifact.name))
        {
            Some(missing) => Err(HapflowError::file_not_found(
                &stage.name,
                self.store.path(&missing.name),
            )),
            None => Ok(()),
        }
    }

    async fn execute(&self, stage: &Stage) -> Result<()> {
        let invocation = self.tool_set.invocation(stage, self.store.as_ref())?;
        info!(command = %invocation, "Running {}", stage.name);

        let tools = Arc::clone(&self.tools);
        let producer: Producer<'_> = Box::pin(async move {
            tools
                .run(&invocation)
                .await
                .and_then(|exit| exit.check(&invocation.program))
                .map(|_| ())
                .map_err(|cause| HapflowError::StageFailed {
                    stage: stage.name.clone(),
                    kind: stage.kind,
                    artifact: stage.output.name.clone(),
                    cause,
                })
        });

        self.store.write(&stage.output.name, producer).await
    }

    fn outcome(&self, stage: &Stage, status: StageStatus, duration_ms: f64) -> StageOutcome {
        StageOutcome {
            stage: stage.name.clone(),
            kind: stage.kind,
            output: stage.output.name.clone(),
            status,
            duration_ms,
        }
    }
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("tool_set", &self.tool_set)
            .field("fresh", &self.fresh)
            .finish_non_exhaustive()
    }
}
