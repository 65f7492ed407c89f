//! Artifacts: named files produced and consumed by stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What an artifact holds, which decides whether it carries a companion index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Aligned reads (BAM); companion `.bai`.
    Alignment,
    /// Reference sequence (FASTA); companion `.fai`.
    Reference,
    /// Consensus class probabilities (HDF).
    Probabilities,
    /// Plain variant calls (VCF).
    Variants,
    /// Block-compressed variant calls (VCF.GZ); companion `.tbi`.
    CompressedVariants,
    /// An index sidecar for another artifact.
    Index,
}

impl ArtifactKind {
    /// Suffix appended to the artifact name to form its companion index.
    #[must_use]
    pub fn companion_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Alignment => Some(".bai"),
            Self::Reference => Some(".fai"),
            Self::CompressedVariants => Some(".tbi"),
            Self::Probabilities | Self::Variants | Self::Index => None,
        }
    }
}

/// A named file in the checkpoint store.
///
/// Names are relative to the store root for pipeline outputs and absolute
/// for the caller's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// The artifact name (the checkpoint key).
    pub name: String,
    /// What the artifact holds.
    pub kind: ArtifactKind,
}

impl Artifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates an alignment artifact.
    #[must_use]
    pub fn alignment(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::Alignment)
    }

    /// Creates a reference artifact.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::Reference)
    }

    /// Creates a probability artifact.
    #[must_use]
    pub fn probabilities(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::Probabilities)
    }

    /// Creates a plain variant-call artifact.
    #[must_use]
    pub fn variants(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::Variants)
    }

    /// Creates a compressed variant-call artifact.
    #[must_use]
    pub fn compressed_variants(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::CompressedVariants)
    }

    /// Returns the companion index artifact, if this kind carries one.
    #[must_use]
    pub fn companion(&self) -> Option<Self> {
        self.kind
            .companion_suffix()
            .map(|suffix| Self::new(format!("{}{suffix}", self.name), ArtifactKind::Index))
    }

    /// Returns the block-compressed counterpart of a variant artifact.
    #[must_use]
    pub fn compressed(&self) -> Self {
        Self::compressed_variants(format!("{}.gz", self.name))
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
