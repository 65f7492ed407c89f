//! The haplotyping pipeline driver.

use super::cleanup::delete_intermediates;
use super::plan::{build_plan, final_artifacts, intermediates, PlanInputs};
use crate::config::PipelineConfig;
use crate::core::{Artifact, PipelineEvent, StageStatus};
use crate::errors::{HapflowError, Result};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::stages::{Stage, StageOutcome, StageRunner};
use crate::store::{ArtifactStore, FsArtifactStore};
use crate::tools::{ProcessToolRunner, ToolRunner, ToolSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Instrument};
use uuid::Uuid;

/// Name under which input validation failures are reported.
pub const INPUT_VALIDATION: &str = "input validation";

/// The result of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique id of this run.
    pub run_id: String,
    /// Every stage executed or reused, in order, follow-up indices included.
    pub stages: Vec<StageOutcome>,
    /// Final unphased diploid calls.
    pub final_unphased: PathBuf,
    /// Final phased diploid calls.
    pub final_phased: PathBuf,
    /// Number of intermediate artifacts deleted (zero without cleanup).
    pub removed: usize,
    /// Total wall-clock time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineReport {
    /// Number of stages whose tool actually ran.
    #[must_use]
    pub fn executed(&self) -> usize {
        self.count(StageStatus::Completed)
    }

    /// Number of stages satisfied by an existing output.
    #[must_use]
    pub fn reused(&self) -> usize {
        self.count(StageStatus::Reused)
    }

    /// Names of the stages whose tool actually ran, in order.
    #[must_use]
    pub fn executed_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|o| o.status == StageStatus::Completed)
            .map(|o| o.stage.as_str())
            .collect()
    }

    fn count(&self, status: StageStatus) -> usize {
        self.stages.iter().filter(|o| o.status == status).count()
    }
}

/// Drives the two-round haplotyping workflow.
///
/// One run validates inputs, prepares the store, runs every planned stage in
/// order and optionally deletes intermediates. The first error aborts the run.
pub struct HaplotypingPipeline {
    config: PipelineConfig,
    store: Arc<dyn ArtifactStore>,
    tools: Arc<dyn ToolRunner>,
    events: Arc<dyn EventSink>,
}

impl HaplotypingPipeline {
    /// Creates a pipeline over an explicit store and tool runner.
    #[must_use]
    pub fn new(config: PipelineConfig, store: Arc<dyn ArtifactStore>, tools: Arc<dyn ToolRunner>) -> Self {
        Self {
            config,
            store,
            tools,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Creates a pipeline writing to `config.output_dir` and running real processes.
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        let store = Arc::new(FsArtifactStore::new(config.output_dir.clone()));
        Self::new(config, store, Arc::new(ProcessToolRunner::new()))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Derives the plan inputs from the configuration.
    ///
    /// Relative input paths are made absolute so they resolve the same way
    /// from inside the output directory.
    pub fn plan_inputs(&self) -> Result<PlanInputs> {
        let extract = !self.config.parsed_regions()?.is_empty();
        Ok(PlanInputs::new(
            absolute_name(&self.config.bam)?,
            absolute_name(&self.config.reference)?,
            self.config.het_threshold,
        )
        .with_region_extraction(extract))
    }

    /// Returns the ordered stage list this configuration runs.
    pub fn plan(&self) -> Result<Vec<Stage>> {
        Ok(build_plan(&self.plan_inputs()?))
    }

    /// Runs the whole pipeline.
    pub async fn run(&self) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("pipeline", run_id = %run_id);

        let result = self.execute(&run_id).instrument(span.clone()).await;

        if let Err(err) = &result {
            span.in_scope(|| error!(code = err.code(), "{err}"));
            self.events
                .emit(&PipelineEvent::pipeline_failed(&run_id, err.to_dict()))
                .await;
        }
        result
    }

    async fn execute(&self, run_id: &str) -> Result<PipelineReport> {
        let timer = SpanTimer::start("pipeline");

        self.config.validate()?;
        let inputs = self.plan_inputs()?;
        self.validate_inputs(&inputs)?;

        self.events
            .emit(&PipelineEvent::pipeline_started(
                run_id,
                &self.store.path("").display().to_string(),
            ))
            .await;
        self.store.prepare().await?;

        let tool_set = ToolSet::new(self.config.tools.clone(), self.config.tool_settings()?);
        let mut runner = StageRunner::new(Arc::clone(&self.store), Arc::clone(&self.tools), tool_set)
            .with_event_sink(Arc::clone(&self.events));

        let plan = build_plan(&inputs);
        let mut stages = Vec::with_capacity(plan.len() * 2);
        for stage in &plan {
            stages.extend(runner.run(stage).await?);
        }

        let removed = if self.config.delete_intermediates {
            let removed = delete_intermediates(self.store.as_ref(), &intermediates(&plan, &inputs)).await?;
            self.events.emit(&PipelineEvent::cleanup_completed(removed)).await;
            removed
        } else {
            0
        };

        let [unphased, phased] = final_artifacts();
        let mut report = PipelineReport {
            run_id: run_id.to_string(),
            stages,
            final_unphased: self.store.path(&unphased),
            final_phased: self.store.path(&phased),
            removed,
            duration_ms: 0.0,
        };
        report.duration_ms = timer.finish();

        info!(
            executed = report.executed(),
            reused = report.reused(),
            "Pipeline finished, final calls in {}",
            report.final_phased.display()
        );
        self.events
            .emit(&PipelineEvent::pipeline_completed(
                run_id,
                report.executed(),
                report.reused(),
                report.duration_ms,
            ))
            .await;

        Ok(report)
    }

    /// Checks the caller's inputs before anything is created or invoked.
    fn validate_inputs(&self, inputs: &PlanInputs) -> Result<()> {
        let alignment = inputs.alignment();
        let required: Vec<Artifact> = std::iter::once(alignment.clone())
            .chain(alignment.companion())
            .chain(std::iter::once(inputs.reference()))
            .collect();

        match required.iter().find(|a| !self.store.exists(&a.name)) {
            Some(missing) => Err(HapflowError::file_not_found(
                INPUT_VALIDATION,
                self.store.path(&missing.name),
            )),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for HaplotypingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaplotypingPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn absolute_name(path: &Path) -> Result<String> {
    Ok(std::path::absolute(path)?.display().to_string())
}
