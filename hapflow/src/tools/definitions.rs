//! Turning stages into concrete tool invocations.

use super::ToolInvocation;
use crate::core::{ArtifactKind, Region, StageKind};
use crate::errors::{HapflowError, Result};
use crate::stages::Stage;
use crate::store::ArtifactStore;
use serde::{Deserialize, Serialize};

/// Program names (or paths) of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Consensus, snp calling and diploid merge.
    #[serde(default = "default_medaka")]
    pub medaka: String,
    /// Phasing and haplotagging.
    #[serde(default = "default_whatshap")]
    pub whatshap: String,
    /// Region extraction and alignment/reference indexing.
    #[serde(default = "default_samtools")]
    pub samtools: String,
    /// Block compression.
    #[serde(default = "default_bgzip")]
    pub bgzip: String,
    /// Compressed variant indexing.
    #[serde(default = "default_tabix")]
    pub tabix: String,
}

fn default_medaka() -> String {
    "medaka".to_string()
}

fn default_whatshap() -> String {
    "whatshap".to_string()
}

fn default_samtools() -> String {
    "samtools".to_string()
}

fn default_bgzip() -> String {
    "bgzip".to_string()
}

fn default_tabix() -> String {
    "tabix".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            medaka: default_medaka(),
            whatshap: default_whatshap(),
            samtools: default_samtools(),
            bgzip: default_bgzip(),
            tabix: default_tabix(),
        }
    }
}

/// Run-wide parameters passed through to the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Consensus model identifier.
    pub model: String,
    /// Consensus batch size.
    pub batch_size: usize,
    /// Worker count for every tool that accepts one.
    pub threads: usize,
    /// Optional region restriction for extraction and consensus.
    pub regions: Vec<Region>,
}

/// Builds invocations for every stage kind.
#[derive(Debug, Clone)]
pub struct ToolSet {
    paths: ToolPaths,
    settings: ToolSettings,
}

impl ToolSet {
    /// Creates a tool set.
    #[must_use]
    pub fn new(paths: ToolPaths, settings: ToolSettings) -> Self {
        Self { paths, settings }
    }

    fn region_args(&self) -> impl Iterator<Item = String> + '_ {
        self.settings.regions.iter().map(ToString::to_string)
    }

    /// Assembles the command for `stage`, resolving artifacts through `store`.
    pub fn invocation(&self, stage: &Stage, store: &dyn ArtifactStore) -> Result<ToolInvocation> {
        let path = |name: &str| store.path(name);
        let output = path(&stage.output.name);
        let threads = self.settings.threads.to_string();

        let invocation = match (stage.kind, stage.inputs.as_slice()) {
            (StageKind::ExtractRegion, [bam]) => ToolInvocation::new(&self.paths.samtools)
                .args(["view", "-@", threads.as_str(), "-b", "-o"])
                .path_arg(&output)
                .path_arg(&path(&bam.name))
                .args(self.region_args()),

            (StageKind::Consensus, [bam]) => {
                let mut inv = ToolInvocation::new(&self.paths.medaka)
                    .arg("consensus")
                    .path_arg(&path(&bam.name))
                    .path_arg(&output)
                    .args(["--model", self.settings.model.as_str()])
                    .args(["--batch_size".to_string(), self.settings.batch_size.to_string()])
                    .args(["--threads", threads.as_str()]);
                if !self.settings.regions.is_empty() {
                    inv = inv.arg("--regions").args(self.region_args());
                }
                inv.args(stage.options.iter().cloned())
            }

            (StageKind::SnpCall, [reference, probs]) => {
                let threshold = stage.threshold.ok_or_else(|| {
                    HapflowError::Internal(format!("stage '{}' has no calling threshold", stage.name))
                })?;
                ToolInvocation::new(&self.paths.medaka)
                    .arg("snp")
                    .path_arg(&path(&reference.name))
                    .path_arg(&path(&probs.name))
                    .path_arg(&output)
                    .args(["--threshold".to_string(), threshold.to_string()])
                    .args(stage.options.iter().cloned())
            }

            (StageKind::Merge, [hap1, hap2, reference]) => ToolInvocation::new(&self.paths.medaka)
                .args(["tools", "haploid2diploid"])
                .path_arg(&path(&hap1.name))
                .path_arg(&path(&hap2.name))
                .path_arg(&path(&reference.name))
                .path_arg(&output),

            (StageKind::Phase, [reference, vcf, bam]) => ToolInvocation::new(&self.paths.whatshap)
                .args(["phase", "-o"])
                .path_arg(&output)
                .arg("--reference")
                .path_arg(&path(&reference.name))
                .path_arg(&path(&vcf.name))
                .path_arg(&path(&bam.name))
                .arg("--ignore-read-groups"),

            (StageKind::Haplotag, [reference, vcf_gz, bam]) => ToolInvocation::new(&self.paths.whatshap)
                .args(["haplotag", "-o"])
                .path_arg(&output)
                .arg("--reference")
                .path_arg(&path(&reference.name))
                .path_arg(&path(&vcf_gz.name))
                .path_arg(&path(&bam.name))
                .arg("--ignore-read-groups"),

            (StageKind::Compress, [vcf]) => ToolInvocation::new(&self.paths.bgzip)
                .args(["-@", threads.as_str(), "-c"])
                .path_arg(&path(&vcf.name))
                .stdout_to(output.clone()),

            (StageKind::Index, [target]) => match target.kind {
                ArtifactKind::Alignment => ToolInvocation::new(&self.paths.samtools)
                    .args(["index", "-@", threads.as_str()])
                    .path_arg(&path(&target.name)),
                ArtifactKind::Reference => ToolInvocation::new(&self.paths.samtools)
                    .arg("faidx")
                    .path_arg(&path(&target.name)),
                ArtifactKind::CompressedVariants => ToolInvocation::new(&self.paths.tabix)
                    .args(["-f", "-p", "vcf"])
                    .path_arg(&path(&target.name)),
                other => {
                    return Err(HapflowError::Internal(format!(
                        "stage '{}' cannot index a {other:?} artifact",
                        stage.name
                    )))
                }
            },

            (kind, inputs) => {
                return Err(HapflowError::Internal(format!(
                    "stage '{}' ({kind}) has {} inputs, which does not match its kind",
                    stage.name,
                    inputs.len()
                )))
            }
        };

        Ok(invocation.producing(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, HaplotypeContext};
    use crate::store::InMemoryArtifactStore;
    use pretty_assertions::assert_eq;

    fn tool_set(regions: Vec<Region>) -> ToolSet {
        ToolSet::new(
            ToolPaths::default(),
            ToolSettings {
                model: "r941_min_high".to_string(),
                batch_size: 200,
                threads: 4,
                regions,
            },
        )
    }

    #[test]
    fn test_consensus_with_tag_filter_and_regions() {
        let store = InMemoryArtifactStore::new();
        let stage = Stage::new(
            "round_1_consensus_hap_1",
            StageKind::Consensus,
            vec![Artifact::alignment("round_0_hap_mixed_phased.bam")],
            Artifact::probabilities("round_1_hap_1_probs.hdf"),
        )
        .with_options(HaplotypeContext::Hap1.tag_options());

        let inv = tool_set(vec![Region::span("chr1", 1, 1000)])
            .invocation(&stage, &store)
            .unwrap();

        assert_eq!(inv.program, "medaka");
        assert_eq!(
            inv.args,
            vec![
                "consensus",
                "/memory/round_0_hap_mixed_phased.bam",
                "/memory/round_1_hap_1_probs.hdf",
                "--model",
                "r941_min_high",
                "--batch_size",
                "200",
                "--threads",
                "4",
                "--regions",
                "chr1:1-1000",
                "--tag_name",
                "HP",
                "--tag_value",
                "1",
                "--tag_keep_missing",
            ]
        );
        assert_eq!(inv.produces.as_deref(), Some(std::path::Path::new("/memory/round_1_hap_1_probs.hdf")));
    }

    #[test]
    fn test_snp_call_threshold() {
        let store = InMemoryArtifactStore::new();
        let stage = Stage::new(
            "round_2_snp_call_hap_2",
            StageKind::SnpCall,
            vec![
                Artifact::reference("/ref.fasta"),
                Artifact::probabilities("round_2_hap_2_probs.hdf"),
            ],
            Artifact::variants("round_2_hap_2.vcf"),
        )
        .with_threshold(1.0);

        let inv = tool_set(vec![]).invocation(&stage, &store).unwrap();
        assert_eq!(&inv.args[..2], &["snp", "/ref.fasta"]);
        assert_eq!(&inv.args[4..], &["--threshold", "1"]);
    }

    #[test]
    fn test_snp_call_without_threshold_is_rejected() {
        let store = InMemoryArtifactStore::new();
        let stage = Stage::new(
            "snp",
            StageKind::SnpCall,
            vec![Artifact::reference("/ref.fasta"), Artifact::probabilities("p.hdf")],
            Artifact::variants("v.vcf"),
        );
        assert!(tool_set(vec![]).invocation(&stage, &store).is_err());
    }

    #[test]
    fn test_phase_ignores_read_groups() {
        let store = InMemoryArtifactStore::new();
        let stage = Stage::new(
            "round_0_phase",
            StageKind::Phase,
            vec![
                Artifact::reference("/ref.fasta"),
                Artifact::variants("round_0_hap_mixed_unphased.vcf"),
                Artifact::alignment("/reads.bam"),
            ],
            Artifact::variants("round_0_hap_mixed_phased.vcf"),
        );

        let inv = tool_set(vec![]).invocation(&stage, &store).unwrap();
        assert_eq!(inv.to_string(), "whatshap phase -o /memory/round_0_hap_mixed_phased.vcf --reference /ref.fasta /memory/round_0_hap_mixed_unphased.vcf /reads.bam --ignore-read-groups");
    }

    #[test]
    fn test_compress_redirects_stdout() {
        let store = InMemoryArtifactStore::new();
        let vcf = Artifact::variants("round_1_phased.vcf");
        let stage = Stage::new("round_1_compress", StageKind::Compress, vec![vcf.clone()], vcf.compressed());

        let inv = tool_set(vec![]).invocation(&stage, &store).unwrap();
        assert_eq!(inv.to_string(), "bgzip -@ 4 -c /memory/round_1_phased.vcf > /memory/round_1_phased.vcf.gz");
    }

    #[test]
    fn test_index_tool_depends_on_target_kind() {
        let store = InMemoryArtifactStore::new();
        let tools = tool_set(vec![]);

        let bam = Stage::index_of(&Artifact::alignment("regions.bam")).unwrap();
        assert_eq!(tools.invocation(&bam, &store).unwrap().to_string(), "samtools index -@ 4 /memory/regions.bam");

        let fasta = Stage::index_of(&Artifact::reference("/ref.fasta")).unwrap();
        assert_eq!(tools.invocation(&fasta, &store).unwrap().to_string(), "samtools faidx /ref.fasta");

        let vcf = Stage::index_of(&Artifact::compressed_variants("x.vcf.gz")).unwrap();
        let inv = tools.invocation(&vcf, &store).unwrap();
        assert_eq!(inv.to_string(), "tabix -f -p vcf /memory/x.vcf.gz");
        assert_eq!(inv.produces.as_deref(), Some(std::path::Path::new("/memory/x.vcf.gz.tbi")));
    }

    #[test]
    fn test_mismatched_inputs_are_rejected() {
        let store = InMemoryArtifactStore::new();
        let stage = Stage::new("bad", StageKind::Merge, vec![], Artifact::variants("m.vcf"));
        let err = tool_set(vec![]).invocation(&stage, &store).unwrap_err();
        assert!(err.to_string().contains("does not match its kind"));
    }

    #[test]
    fn test_tool_paths_deserialize_with_defaults() {
        let paths: ToolPaths = serde_json::from_str(r#"{"samtools": "/opt/samtools"}"#).unwrap();
        assert_eq!(paths.samtools, "/opt/samtools");
        assert_eq!(paths.medaka, "medaka");
    }
}
