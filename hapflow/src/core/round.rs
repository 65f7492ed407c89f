//! Refinement rounds, haplotype contexts, and the artifact naming scheme.
//!
//! The naming functions are the only place round and haplotype identity is
//! turned into file names, so the round-0/1/2 lineage can be checked without
//! running anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Threshold used for haploid calling once reads are partitioned.
pub const HAPLOID_THRESHOLD: f64 = 1.0;

/// Output of the optional region-extraction stage.
pub const REGION_ALIGNMENT: &str = "regions.bam";

/// A refinement pass. The pipeline always runs exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
    /// Mixed-read calling and the first, coarse haplotype partition.
    Zero,
    /// First haploid pass over the coarse partition, followed by re-phasing.
    One,
    /// Final haploid pass over the improved partition.
    Two,
}

impl Round {
    /// The generation counter used in artifact names.
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
        }
    }

    fn prefix(self) -> String {
        format!("round_{}", self.index())
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round_{}", self.index())
    }
}

/// Which reads a consensus or calling invocation pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaplotypeContext {
    /// All reads, zygosity unresolved.
    Mixed,
    /// Reads tagged as haplotype 1.
    Hap1,
    /// Reads tagged as haplotype 2.
    Hap2,
}

impl HaplotypeContext {
    /// The two split haplotypes, in calling order.
    pub const SPLIT: [Self; 2] = [Self::Hap1, Self::Hap2];

    /// Label used in artifact and stage names.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Hap1 => "1",
            Self::Hap2 => "2",
        }
    }

    /// Read-selection options passed to the consensus tool.
    #[must_use]
    pub fn tag_options(&self) -> Vec<String> {
        let value = match self {
            Self::Mixed => return Vec::new(),
            Self::Hap1 => "1",
            Self::Hap2 => "2",
        };
        ["--tag_name", "HP", "--tag_value", value, "--tag_keep_missing"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Calling threshold for this context.
    ///
    /// Only mixed reads use the configured heterozygous threshold.
    #[must_use]
    pub fn threshold(&self, het_threshold: f64) -> f64 {
        match self {
            Self::Mixed => het_threshold,
            Self::Hap1 | Self::Hap2 => HAPLOID_THRESHOLD,
        }
    }
}

impl fmt::Display for HaplotypeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hap_{}", self.label())
    }
}

/// Probability artifact of a consensus run.
#[must_use]
pub fn probabilities(round: Round, hap: HaplotypeContext) -> String {
    format!("{}_{hap}_probs.hdf", round.prefix())
}

/// Variant calls of a single consensus run.
///
/// The mixed round-0 call set is unphased; split calls are haploid.
#[must_use]
pub fn called_variants(round: Round, hap: HaplotypeContext) -> String {
    match hap {
        HaplotypeContext::Mixed => format!("{}_{hap}_unphased.vcf", round.prefix()),
        HaplotypeContext::Hap1 | HaplotypeContext::Hap2 => format!("{}_{hap}.vcf", round.prefix()),
    }
}

/// The unphased diploid call set of a round: the mixed calls in round 0, the
/// diploid merge afterwards.
#[must_use]
pub fn unphased_variants(round: Round) -> String {
    match round {
        Round::Zero => called_variants(round, HaplotypeContext::Mixed),
        Round::One => format!("{}_unphased.vcf", round.prefix()),
        Round::Two => format!("{}_final_unphased.vcf", round.prefix()),
    }
}

/// The phased diploid call set of a round.
#[must_use]
pub fn phased_variants(round: Round) -> String {
    match round {
        Round::Zero => format!("{}_{}_phased.vcf", round.prefix(), HaplotypeContext::Mixed),
        Round::One => format!("{}_phased.vcf", round.prefix()),
        Round::Two => format!("{}_final_phased.vcf", round.prefix()),
    }
}

/// The haplotype-tagged alignment produced at the end of a round.
///
/// The final round does not re-tag.
#[must_use]
pub fn tagged_alignment(round: Round) -> Option<String> {
    match round {
        Round::Zero => Some(format!("{}_{}_phased.bam", round.prefix(), HaplotypeContext::Mixed)),
        Round::One => Some(format!("{}_phased.bam", round.prefix())),
        Round::Two => None,
    }
}
