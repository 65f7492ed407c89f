//! The fixed two-round haplotyping workflow as an ordered list of stages.
//!
//! Building the plan is pure: it depends only on the input names, whether
//! regions were requested, and the heterozygous threshold. The driver runs
//! the stages strictly in the returned order.

use crate::core::round::{
    called_variants, phased_variants, probabilities, tagged_alignment, unphased_variants,
    REGION_ALIGNMENT,
};
use crate::core::{Artifact, HaplotypeContext, Round, StageKind};
use crate::stages::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The inputs a plan is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInputs {
    /// Input alignment name.
    pub bam: String,
    /// Reference name.
    pub reference: String,
    /// Whether reads are first restricted to the requested regions.
    pub extract_regions: bool,
    /// Calling threshold for the mixed-read round.
    pub het_threshold: f64,
}

impl PlanInputs {
    /// Creates plan inputs without region extraction.
    #[must_use]
    pub fn new(bam: impl Into<String>, reference: impl Into<String>, het_threshold: f64) -> Self {
        Self {
            bam: bam.into(),
            reference: reference.into(),
            extract_regions: false,
            het_threshold,
        }
    }

    /// Enables or disables region extraction.
    #[must_use]
    pub fn with_region_extraction(mut self, extract: bool) -> Self {
        self.extract_regions = extract;
        self
    }

    /// The input alignment.
    #[must_use]
    pub fn alignment(&self) -> Artifact {
        Artifact::alignment(&self.bam)
    }

    /// The reference.
    #[must_use]
    pub fn reference(&self) -> Artifact {
        Artifact::reference(&self.reference)
    }

    /// The alignment every phasing and tagging stage reads: the extracted
    /// regions when requested, otherwise the input itself.
    #[must_use]
    pub fn working_alignment(&self) -> Artifact {
        if self.extract_regions {
            Artifact::alignment(REGION_ALIGNMENT)
        } else {
            self.alignment()
        }
    }
}

/// Builds the ordered stage list.
///
/// Follow-up index stages are not listed; the stage runner derives them
/// from each stage's output.
#[must_use]
pub fn build_plan(inputs: &PlanInputs) -> Vec<Stage> {
    let reference = inputs.reference();
    let alignment = inputs.working_alignment();
    let mut plan = Vec::with_capacity(24);

    if inputs.extract_regions {
        plan.push(Stage::new(
            "extract_regions",
            StageKind::ExtractRegion,
            vec![inputs.alignment()],
            alignment.clone(),
        ));
    }
    plan.extend(Stage::index_of(&reference));

    plan.extend(mixed_round(&reference, &alignment, inputs.het_threshold));

    let mut partition = tagged_alignment(Round::Zero).map(Artifact::alignment);
    for round in [Round::One, Round::Two] {
        if let Some(tagged) = partition.take() {
            plan.extend(split_round(round, &reference, &alignment, &tagged, inputs.het_threshold));
            partition = tagged_alignment(round).map(Artifact::alignment);
        }
    }

    plan
}

fn mixed_round(reference: &Artifact, alignment: &Artifact, het_threshold: f64) -> Vec<Stage> {
    let round = Round::Zero;
    let hap = HaplotypeContext::Mixed;
    let probs = Artifact::probabilities(probabilities(round, hap));
    let unphased = Artifact::variants(unphased_variants(round));

    let mut stages = vec![
        Stage::new(
            format!("{round}_consensus"),
            StageKind::Consensus,
            vec![alignment.clone()],
            probs.clone(),
        )
        .in_round(round)
        .for_haplotype(hap),
        Stage::new(
            format!("{round}_snp_call"),
            StageKind::SnpCall,
            vec![reference.clone(), probs],
            unphased.clone(),
        )
        .in_round(round)
        .for_haplotype(hap)
        .with_threshold(hap.threshold(het_threshold)),
    ];
    stages.extend(phase_and_tag(round, reference, alignment, unphased));
    stages
}

fn split_round(
    round: Round,
    reference: &Artifact,
    alignment: &Artifact,
    tagged: &Artifact,
    het_threshold: f64,
) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(8);

    for hap in HaplotypeContext::SPLIT {
        stages.push(
            Stage::new(
                format!("{round}_consensus_{hap}"),
                StageKind::Consensus,
                vec![tagged.clone()],
                Artifact::probabilities(probabilities(round, hap)),
            )
            .in_round(round)
            .for_haplotype(hap)
            .with_options(hap.tag_options()),
        );
    }

    for hap in HaplotypeContext::SPLIT {
        stages.push(
            Stage::new(
                format!("{round}_snp_call_{hap}"),
                StageKind::SnpCall,
                vec![
                    reference.clone(),
                    Artifact::probabilities(probabilities(round, hap)),
                ],
                Artifact::variants(called_variants(round, hap)),
            )
            .in_round(round)
            .for_haplotype(hap)
            .with_threshold(hap.threshold(het_threshold)),
        );
    }

    let [hap1, hap2] = HaplotypeContext::SPLIT.map(|hap| Artifact::variants(called_variants(round, hap)));
    let merged = Artifact::variants(unphased_variants(round));
    stages.push(
        Stage::new(
            format!("{round}_merge"),
            StageKind::Merge,
            vec![hap1, hap2, reference.clone()],
            merged.clone(),
        )
        .in_round(round),
    );

    stages.extend(phase_and_tag(round, reference, alignment, merged));
    stages
}

/// Phases `unphased`; rounds that feed another round also compress the
/// result and tag the alignment with it.
fn phase_and_tag(round: Round, reference: &Artifact, alignment: &Artifact, unphased: Artifact) -> Vec<Stage> {
    let phased = Artifact::variants(phased_variants(round));
    let mut stages = vec![Stage::new(
        format!("{round}_phase"),
        StageKind::Phase,
        vec![reference.clone(), unphased, alignment.clone()],
        phased.clone(),
    )
    .in_round(round)];

    if let Some(tagged) = tagged_alignment(round) {
        let compressed = phased.compressed();
        stages.push(
            Stage::new(
                format!("{round}_compress"),
                StageKind::Compress,
                vec![phased],
                compressed.clone(),
            )
            .in_round(round),
        );
        stages.push(
            Stage::new(
                format!("{round}_haplotag"),
                StageKind::Haplotag,
                vec![reference.clone(), compressed, alignment.clone()],
                Artifact::alignment(tagged),
            )
            .in_round(round),
        );
    }

    stages
}

/// The two artifacts that survive cleanup: the final unphased and phased
/// diploid calls.
#[must_use]
pub fn final_artifacts() -> [String; 2] {
    [unphased_variants(Round::Two), phased_variants(Round::Two)]
}

/// Every artifact the plan writes into the store, follow-up indices
/// included, except the final calls and the reference index (which lives
/// beside the caller's reference).
#[must_use]
pub fn intermediates(plan: &[Stage], inputs: &PlanInputs) -> Vec<String> {
    let mut keep: HashSet<String> = final_artifacts().into_iter().collect();
    keep.extend(inputs.reference().companion().map(|a| a.name));

    plan.iter()
        .flat_map(|stage| {
            std::iter::once(stage.output.name.clone())
                .chain(stage.follow_up_index().map(|index| index.output.name))
        })
        .filter(|name| !keep.contains(name))
        .collect()
}
