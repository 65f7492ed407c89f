//! Core domain model types for hapflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Stage kind and status enums
//! - Artifacts and their companion indices
//! - Rounds, haplotype contexts and artifact naming
//! - Region strings
//! - Pipeline lifecycle events

mod artifact;
mod event;
mod region;
pub mod round;
mod status;

pub use artifact::{Artifact, ArtifactKind};
pub use event::PipelineEvent;
pub use region::{load_regions, Region};
pub use round::{HaplotypeContext, Round, HAPLOID_THRESHOLD};
pub use status::{StageKind, StageStatus};
