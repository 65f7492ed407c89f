//! Stage kind and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of external operation a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Restrict an alignment to reads overlapping a set of regions.
    ExtractRegion,
    /// Compute per-position class probabilities from an alignment.
    Consensus,
    /// Call variants from a probability artifact.
    SnpCall,
    /// Merge two haploid call sets into one diploid call set.
    Merge,
    /// Phase an unphased call set using read evidence.
    Phase,
    /// Annotate reads with their haplotype of origin.
    Haplotag,
    /// Block-compress a variant file.
    Compress,
    /// Build a companion index for an alignment, reference or compressed variants.
    Index,
}

impl StageKind {
    /// The diagnostic printed when a stage of this kind fails.
    #[must_use]
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::ExtractRegion => "Failed to extract reads for the requested regions.",
            Self::Consensus => "Failed to run medaka consensus.",
            Self::SnpCall => "Failed to run medaka snp.",
            Self::Merge => "Failed to run medaka tools haploid2diploid.",
            Self::Phase => "Failed to run whatshap phase.",
            Self::Haplotag => "Failed to run whatshap haplotag.",
            Self::Compress => "Failed to compress variants with bgzip.",
            Self::Index => "Failed to index artifact.",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtractRegion => write!(f, "extract_region"),
            Self::Consensus => write!(f, "consensus"),
            Self::SnpCall => write!(f, "snp_call"),
            Self::Merge => write!(f, "merge"),
            Self::Phase => write!(f, "phase"),
            Self::Haplotag => write!(f, "haplotag"),
            Self::Compress => write!(f, "compress"),
            Self::Index => write!(f, "index"),
        }
    }
}

/// The outcome state of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The external operation ran and exited successfully.
    Completed,
    /// The output already existed and was reused.
    Reused,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Reused => write!(f, "reused"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::ExtractRegion.to_string(), "extract_region");
        assert_eq!(StageKind::SnpCall.to_string(), "snp_call");
        assert_eq!(StageKind::Haplotag.to_string(), "haplotag");
    }

    #[test]
    fn test_stage_kind_serialize_matches_display() {
        for kind in [
            StageKind::ExtractRegion,
            StageKind::Consensus,
            StageKind::SnpCall,
            StageKind::Merge,
            StageKind::Phase,
            StageKind::Haplotag,
            StageKind::Compress,
            StageKind::Index,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_stage_status_serialize_matches_display() {
        for status in [StageStatus::Completed, StageStatus::Reused] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
