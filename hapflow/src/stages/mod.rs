//! Stage descriptions and the stage runner.
//!
//! A stage is a named unit of work: one external operation with ordered
//! input artifacts and one declared output artifact. Stages carry no state
//! of their own; the driver rebuilds them every run from the naming scheme.

mod runner;

pub use runner::{StageOutcome, StageRunner};

use crate::core::{Artifact, HaplotypeContext, Round, StageKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One external operation with its inputs and declared output.
///
/// Input order is significant and fixed per kind:
///
/// | kind | inputs |
/// |------|--------|
/// | `ExtractRegion` | alignment |
/// | `Consensus` | alignment |
/// | `SnpCall` | reference, probabilities |
/// | `Merge` | haplotype-1 variants, haplotype-2 variants, reference |
/// | `Phase` | reference, unphased variants, alignment |
/// | `Haplotag` | reference, compressed phased variants, alignment |
/// | `Compress` | variants |
/// | `Index` | the artifact being indexed |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// The unique name of the stage.
    pub name: String,
    /// The operation performed.
    pub kind: StageKind,
    /// The refinement round, if the stage belongs to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<Round>,
    /// The haplotype context of consensus and calling stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haplotype: Option<HaplotypeContext>,
    /// Ordered input artifacts.
    pub inputs: Vec<Artifact>,
    /// The declared output; its existence is the stage's checkpoint.
    pub output: Artifact,
    /// Opaque extra flags passed through to the tool.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Calling threshold, for variant-calling stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl Stage {
    /// Creates a new stage.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: StageKind,
        inputs: Vec<Artifact>,
        output: Artifact,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            round: None,
            haplotype: None,
            inputs,
            output,
            options: Vec::new(),
            threshold: None,
        }
    }

    /// Creates the stage that builds `target`'s companion index.
    ///
    /// Returns `None` for artifacts without a companion.
    #[must_use]
    pub fn index_of(target: &Artifact) -> Option<Self> {
        let index = target.companion()?;
        let file_name = Path::new(&target.name)
            .file_name()
            .map_or_else(|| target.name.clone(), |n| n.to_string_lossy().into_owned());
        Some(Self::new(
            format!("index_{file_name}"),
            StageKind::Index,
            vec![target.clone()],
            index,
        ))
    }

    /// Tags the stage with its round.
    #[must_use]
    pub fn in_round(mut self, round: Round) -> Self {
        self.round = Some(round);
        self
    }

    /// Tags the stage with its haplotype context.
    #[must_use]
    pub fn for_haplotype(mut self, haplotype: HaplotypeContext) -> Self {
        self.haplotype = Some(haplotype);
        self
    }

    /// Adds pass-through options.
    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Sets the calling threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Every artifact that must exist before the stage may run.
    ///
    /// Inputs consumed as alignments, references or compressed variants
    /// bring their companion index along, except for the stage that builds
    /// that index.
    #[must_use]
    pub fn required_artifacts(&self) -> Vec<Artifact> {
        let mut required = Vec::with_capacity(self.inputs.len() * 2);
        for input in &self.inputs {
            required.push(input.clone());
            if self.kind != StageKind::Index {
                required.extend(input.companion());
            }
        }
        required
    }

    /// The indexing stage that must follow this one, if its output carries
    /// a companion index.
    #[must_use]
    pub fn follow_up_index(&self) -> Option<Self> {
        if self.kind == StageKind::Index {
            return None;
        }
        Self::index_of(&self.output)
    }
}
