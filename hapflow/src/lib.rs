//! # Hapflow
//!
//! A checkpointed driver for two-round haplotype-resolved variant calling.
//!
//! Hapflow runs external tools (medaka, whatshap, samtools, bgzip, tabix)
//! through a fixed sequence of stages with support for:
//!
//! - **Checkpointing**: a stage whose output already exists is not run again
//! - **Fail-fast execution**: the first missing input or failing tool aborts
//!   the run with an error naming the stage and the artifact
//! - **Haplotype refinement**: a mixed-read round partitions the reads, two
//!   haploid rounds call each haplotype and re-derive the partition
//! - **Cleanup**: optional removal of everything but the final calls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hapflow::prelude::*;
//!
//! let config = PipelineConfig::new("reads.bam", "ref.fasta")
//!     .with_output_dir("medaka_variant")
//!     .with_threads(8);
//!
//! let report = HaplotypingPipeline::from_config(config).run().await?;
//! println!("{}", report.final_phased.display());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod store;
pub mod testing;
pub mod tools;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        Artifact, ArtifactKind, HaplotypeContext, PipelineEvent, Region, Round, StageKind,
        StageStatus,
    };
    pub use crate::errors::{HapflowError, Result, ToolFailure};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{HaplotypingPipeline, PipelineReport};
    pub use crate::stages::{Stage, StageOutcome, StageRunner};
    pub use crate::store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
    pub use crate::tools::{ProcessToolRunner, ToolRunner, ToolSet};
}
