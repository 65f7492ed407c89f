//! Shared fixtures for pipeline tests and benchmarks.

use crate::config::PipelineConfig;
use crate::store::InMemoryArtifactStore;
use crate::tools::{ToolPaths, ToolSet, ToolSettings};

/// Input alignment used by in-memory fixtures.
pub const TEST_BAM: &str = "/data/reads.bam";

/// Reference used by in-memory fixtures.
pub const TEST_REFERENCE: &str = "/data/ref.fasta";

/// A store holding the input alignment, its index and the reference.
#[must_use]
pub fn seeded_store() -> InMemoryArtifactStore {
    InMemoryArtifactStore::with_artifacts([
        TEST_BAM.to_string(),
        format!("{TEST_BAM}.bai"),
        TEST_REFERENCE.to_string(),
    ])
}

/// A configuration over the fixture inputs with default settings.
#[must_use]
pub fn test_config() -> PipelineConfig {
    PipelineConfig::new(TEST_BAM, TEST_REFERENCE)
}

/// A tool set with default programs, one thread and no regions.
#[must_use]
pub fn tool_set() -> ToolSet {
    ToolSet::new(
        ToolPaths::default(),
        ToolSettings {
            model: "r941_min_high".to_string(),
            batch_size: 200,
            threads: 1,
            regions: Vec::new(),
        },
    )
}
