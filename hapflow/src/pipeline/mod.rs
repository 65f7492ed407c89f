//! Pipeline planning and execution.
//!
//! This module provides:
//! - The fixed stage plan and the artifact lineage it implies
//! - The driver that validates inputs and runs the plan
//! - Cleanup of intermediate artifacts

mod cleanup;
mod driver;
mod integration_tests;
mod plan;

pub use cleanup::delete_intermediates;
pub use driver::{HaplotypingPipeline, PipelineReport, INPUT_VALIDATION};
pub use plan::{build_plan, final_artifacts, intermediates, PlanInputs};
