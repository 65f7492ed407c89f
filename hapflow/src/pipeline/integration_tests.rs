//! End-to-end tests of the haplotyping pipeline against fake tools.

#[cfg(test)]
mod tests {
    use crate::config::PipelineConfig;
    use crate::core::StageStatus;
    use crate::errors::HapflowError;
    use crate::events::CollectingEventSink;
    use crate::pipeline::{build_plan, final_artifacts, HaplotypingPipeline, PlanInputs};
    use crate::store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
    use crate::testing::{invocation_label, seeded_store, test_config, RecordingToolRunner, TEST_BAM};
    use crate::tools::MockToolRunner;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    fn pipeline(
        config: PipelineConfig,
        store: &InMemoryArtifactStore,
        tools: &Arc<RecordingToolRunner>,
    ) -> HaplotypingPipeline {
        HaplotypingPipeline::new(config, Arc::new(store.clone()), tools.clone())
    }

    fn generations(store: &InMemoryArtifactStore) -> HashMap<String, Option<u64>> {
        store
            .names()
            .into_iter()
            .map(|name| {
                let generation = store.generation(&name);
                (name, generation)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_run_produces_round_artifacts_in_order() {
        let store = seeded_store();
        let tools = Arc::new(RecordingToolRunner::new());

        let report = pipeline(test_config(), &store, &tools).run().await.unwrap();

        assert_eq!(
            store.writes(),
            vec![
                "/data/ref.fasta.fai",
                "round_0_hap_mixed_probs.hdf",
                "round_0_hap_mixed_unphased.vcf",
                "round_0_hap_mixed_phased.vcf",
                "round_0_hap_mixed_phased.vcf.gz",
                "round_0_hap_mixed_phased.vcf.gz.tbi",
                "round_0_hap_mixed_phased.bam",
                "round_0_hap_mixed_phased.bam.bai",
                "round_1_hap_1_probs.hdf",
                "round_1_hap_2_probs.hdf",
                "round_1_hap_1.vcf",
                "round_1_hap_2.vcf",
                "round_1_unphased.vcf",
                "round_1_phased.vcf",
                "round_1_phased.vcf.gz",
                "round_1_phased.vcf.gz.tbi",
                "round_1_phased.bam",
                "round_1_phased.bam.bai",
                "round_2_hap_1_probs.hdf",
                "round_2_hap_2_probs.hdf",
                "round_2_hap_1.vcf",
                "round_2_hap_2.vcf",
                "round_2_final_unphased.vcf",
                "round_2_final_phased.vcf",
            ]
        );
        assert_eq!(report.executed(), 24);
        assert_eq!(report.reused(), 0);
        assert_eq!(report.final_unphased, Path::new("/memory/round_2_final_unphased.vcf"));
        assert_eq!(report.final_phased, Path::new("/memory/round_2_final_phased.vcf"));
        assert_eq!(
            tools.programs()[..8].to_vec(),
            vec![
                "samtools faidx",
                "medaka consensus",
                "medaka snp",
                "whatshap phase",
                "bgzip",
                "tabix",
                "whatshap haplotag",
                "samtools index",
            ]
        );
    }

    #[tokio::test]
    async fn test_rerun_performs_no_invocations() {
        let store = seeded_store();
        let tools = Arc::new(RecordingToolRunner::new());
        pipeline(test_config(), &store, &tools).run().await.unwrap();
        let before = generations(&store);

        let rerun_tools = Arc::new(RecordingToolRunner::new());
        let sink = Arc::new(CollectingEventSink::new());
        let report = pipeline(test_config(), &store, &rerun_tools)
            .with_event_sink(sink.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(rerun_tools.call_count(), 0);
        assert_eq!(report.executed(), 0);
        assert_eq!(report.reused(), 24);
        assert_eq!(generations(&store), before);
        assert!(sink.events_of_type("stage.started").is_empty());
        assert_eq!(sink.stages_with("stage.reused").len(), 24);
    }

    #[tokio::test]
    async fn test_deleting_one_artifact_reruns_exactly_its_descendants() {
        let store = seeded_store();
        pipeline(test_config(), &store, &Arc::new(RecordingToolRunner::new()))
            .run()
            .await
            .unwrap();

        assert!(store.delete("round_1_hap_2_probs.hdf"));
        let tools = Arc::new(RecordingToolRunner::new());
        let report = pipeline(test_config(), &store, &tools).run().await.unwrap();

        assert_eq!(
            report.executed_stages(),
            vec![
                "round_1_consensus_hap_2",
                "round_1_snp_call_hap_2",
                "round_1_merge",
                "round_1_phase",
                "round_1_compress",
                "index_round_1_phased.vcf.gz",
                "round_1_haplotag",
                "index_round_1_phased.bam",
                "round_2_consensus_hap_1",
                "round_2_consensus_hap_2",
                "round_2_snp_call_hap_1",
                "round_2_snp_call_hap_2",
                "round_2_merge",
                "round_2_phase",
            ]
        );
        let untouched = report
            .stages
            .iter()
            .find(|o| o.stage == "round_1_snp_call_hap_1")
            .unwrap();
        assert_eq!(untouched.status, StageStatus::Reused);
    }

    #[tokio::test]
    async fn test_deleting_a_leaf_reruns_only_that_stage() {
        let store = seeded_store();
        pipeline(test_config(), &store, &Arc::new(RecordingToolRunner::new()))
            .run()
            .await
            .unwrap();

        store.delete("round_2_final_phased.vcf");
        let tools = Arc::new(RecordingToolRunner::new());
        let report = pipeline(test_config(), &store, &tools).run().await.unwrap();

        assert_eq!(report.executed_stages(), vec!["round_2_phase"]);
        assert_eq!(tools.programs(), vec!["whatshap phase"]);
    }

    #[tokio::test]
    async fn test_haploid_rounds_ignore_het_threshold() {
        let store = seeded_store();
        let tools = Arc::new(RecordingToolRunner::new());
        pipeline(test_config().with_het_threshold(0.25), &store, &tools)
            .run()
            .await
            .unwrap();

        let thresholds: Vec<String> = tools
            .invocations()
            .iter()
            .filter(|inv| invocation_label(inv) == "medaka snp")
            .map(|inv| {
                let at = inv.args.iter().position(|a| a == "--threshold").unwrap();
                inv.args[at + 1].clone()
            })
            .collect();

        assert_eq!(thresholds, vec!["0.25", "1", "1", "1", "1"]);
    }

    #[tokio::test]
    async fn test_missing_bam_index_aborts_before_any_invocation() {
        let store = InMemoryArtifactStore::with_artifacts([TEST_BAM, "/data/ref.fasta"]);
        let mut tools = MockToolRunner::new();
        tools.expect_run().never();
        let sink = Arc::new(CollectingEventSink::new());

        let err = HaplotypingPipeline::new(test_config(), Arc::new(store.clone()), Arc::new(tools))
            .with_event_sink(sink.clone())
            .run()
            .await
            .unwrap_err();

        assert!(err.is_precondition());
        assert!(err.to_string().starts_with("File not found: /data/reads.bam.bai"));
        assert!(store.writes().is_empty());
        assert_eq!(store.names(), vec!["/data/reads.bam", "/data/ref.fasta"]);
        assert_eq!(sink.event_types(), vec!["pipeline.failed"]);
    }

    #[tokio::test]
    async fn test_missing_reference_aborts() {
        let store = InMemoryArtifactStore::with_artifacts([TEST_BAM, "/data/reads.bam.bai"]);
        let mut tools = MockToolRunner::new();
        tools.expect_run().never();

        let err = HaplotypingPipeline::new(test_config(), Arc::new(store), Arc::new(tools))
            .run()
            .await
            .unwrap_err();

        match err {
            HapflowError::FileNotFound { stage, path } => {
                assert_eq!(stage, "input validation");
                assert_eq!(path, Path::new("/data/ref.fasta"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_validation() {
        let mut tools = MockToolRunner::new();
        tools.expect_run().never();

        let err = HaplotypingPipeline::new(
            test_config().with_threads(0),
            Arc::new(seeded_store()),
            Arc::new(tools),
        )
        .run()
        .await
        .unwrap_err();

        assert_eq!(err.code(), "CONFIG-INVALID");
    }

    #[tokio::test]
    async fn test_malformed_region_aborts_before_any_stage() {
        let mut tools = MockToolRunner::new();
        tools.expect_run().never();
        let store = seeded_store();

        let err = HaplotypingPipeline::new(
            test_config().with_regions(["HLA-A*01:01:01:01"]),
            Arc::new(store.clone()),
            Arc::new(tools),
        )
        .run()
        .await
        .unwrap_err();

        assert_eq!(err.code(), "CONFIG-INVALID-REGION");
        assert_eq!(store.writes().len(), 0);
    }

    #[tokio::test]
    async fn test_regions_extract_and_substitute_alignment() {
        let store = seeded_store();
        let tools = Arc::new(RecordingToolRunner::new());
        pipeline(test_config().with_regions(["chr1:1-1000"]), &store, &tools)
            .run()
            .await
            .unwrap();

        let invocations = tools.invocations();
        assert_eq!(
            invocations[0].to_string(),
            "samtools view -@ 1 -b -o /memory/regions.bam /data/reads.bam chr1:1-1000"
        );
        assert_eq!(invocations[1].to_string(), "samtools index -@ 1 /memory/regions.bam");

        for inv in &invocations[2..] {
            assert!(
                !inv.args.iter().any(|a| a == TEST_BAM),
                "{inv} reads the unrestricted alignment"
            );
        }
        let consensus = invocations
            .iter()
            .find(|inv| invocation_label(inv) == "medaka consensus")
            .unwrap();
        assert_eq!(consensus.args[1], "/memory/regions.bam");
        assert!(consensus.args.windows(2).any(|w| w == ["--regions", "chr1:1-1000"]));
    }

    #[tokio::test]
    async fn test_tool_failure_aborts_run() {
        let store = seeded_store();
        let tools = Arc::new(RecordingToolRunner::new().failing_on("medaka tools"));
        let sink = Arc::new(CollectingEventSink::new());

        let err = pipeline(test_config(), &store, &tools)
            .with_event_sink(sink.clone())
            .run()
            .await
            .unwrap_err();

        match &err {
            HapflowError::StageFailed { stage, artifact, .. } => {
                assert_eq!(stage, "round_1_merge");
                assert_eq!(artifact, "round_1_unphased.vcf");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("Failed to run medaka tools haploid2diploid."));
        assert_eq!(tools.programs().last().map(String::as_str), Some("medaka tools"));
        assert!(!store.exists("round_1_unphased.vcf"));
        assert!(!store.exists("round_1_phased.vcf"));
        assert_eq!(sink.stages_with("stage.failed"), vec!["round_1_merge"]);
        assert_eq!(sink.event_types().last().map(String::as_str), Some("pipeline.failed"));
    }

    #[tokio::test]
    async fn test_resume_after_failure_skips_completed_stages() {
        let store = seeded_store();
        let failing = Arc::new(RecordingToolRunner::new().failing_on("whatshap haplotag"));
        assert!(pipeline(test_config(), &store, &failing).run().await.is_err());

        let tools = Arc::new(RecordingToolRunner::new());
        let report = pipeline(test_config(), &store, &tools).run().await.unwrap();

        assert_eq!(report.executed_stages()[0], "round_0_haplotag");
        assert_eq!(report.reused(), 6);
    }

    #[tokio::test]
    async fn test_events_bracket_the_run() {
        let store = seeded_store();
        let sink = Arc::new(CollectingEventSink::new());
        pipeline(test_config(), &store, &Arc::new(RecordingToolRunner::new()))
            .with_event_sink(sink.clone())
            .run()
            .await
            .unwrap();

        let types = sink.event_types();
        assert_eq!(types.first().map(String::as_str), Some("pipeline.started"));
        assert_eq!(types.last().map(String::as_str), Some("pipeline.completed"));
        assert_eq!(sink.stages_with("stage.completed").len(), 24);
        assert!(sink.events_of_type("cleanup.").is_empty());
    }

    #[tokio::test]
    async fn test_plan_matches_executed_order() {
        let store = seeded_store();
        let report = pipeline(test_config(), &store, &Arc::new(RecordingToolRunner::new()))
            .run()
            .await
            .unwrap();

        let planned: Vec<String> = build_plan(&PlanInputs::new(TEST_BAM, "/data/ref.fasta", 0.04))
            .into_iter()
            .map(|s| s.name)
            .collect();
        let ran: Vec<String> = report
            .stages
            .iter()
            .map(|o| o.stage.clone())
            .filter(|name| !name.starts_with("index_") || name == "index_ref.fasta")
            .collect();
        assert_eq!(ran, planned);
    }

    struct OnDisk {
        dir: tempfile::TempDir,
        config: PipelineConfig,
    }

    fn on_disk_inputs(with_bai: bool) -> OnDisk {
        let dir = tempfile::tempdir().unwrap();
        let bam = dir.path().join("reads.bam");
        let reference = dir.path().join("ref.fasta");
        std::fs::write(&bam, b"BAM").unwrap();
        std::fs::write(&reference, b">chr1\nACGT\n").unwrap();
        if with_bai {
            std::fs::write(dir.path().join("reads.bam.bai"), b"BAI").unwrap();
        }
        let config = PipelineConfig::new(&bam, &reference).with_output_dir(dir.path().join("out"));
        OnDisk { dir, config }
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn on_disk_pipeline(config: PipelineConfig, tools: RecordingToolRunner) -> HaplotypingPipeline {
        let store = Arc::new(FsArtifactStore::new(config.output_dir.clone()));
        HaplotypingPipeline::new(config, store, Arc::new(tools))
    }

    #[tokio::test]
    async fn test_cleanup_leaves_only_final_calls() {
        let inputs = on_disk_inputs(true);
        let config = inputs.config.clone().with_delete_intermediates(true);
        let out = config.output_dir.clone();
        let sink = Arc::new(CollectingEventSink::new());

        let report = on_disk_pipeline(config, RecordingToolRunner::new().materializing())
            .with_event_sink(sink.clone())
            .run()
            .await
            .unwrap();

        let mut finals = final_artifacts().to_vec();
        finals.sort();
        assert_eq!(listing(&out), finals);
        assert_eq!(report.removed, 21);
        assert!(report.final_phased.exists());
        assert!(inputs.dir.path().join("ref.fasta.fai").exists());
        assert!(inputs.dir.path().join("reads.bam.bai").exists());
        assert_eq!(sink.events_of_type("cleanup.completed").len(), 1);
    }

    #[tokio::test]
    async fn test_on_disk_rerun_reuses_everything() {
        let inputs = on_disk_inputs(true);
        on_disk_pipeline(inputs.config.clone(), RecordingToolRunner::new().materializing())
            .run()
            .await
            .unwrap();
        let out = inputs.config.output_dir.clone();
        let before = std::fs::read_to_string(out.join("round_0_hap_mixed_probs.hdf")).unwrap();

        let report = on_disk_pipeline(inputs.config.clone(), RecordingToolRunner::new().failing_on("medaka consensus"))
            .run()
            .await
            .unwrap();

        assert_eq!(report.executed(), 0);
        assert_eq!(
            std::fs::read_to_string(out.join("round_0_hap_mixed_probs.hdf")).unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn test_on_disk_missing_index_creates_nothing() {
        let inputs = on_disk_inputs(false);
        let out = inputs.config.output_dir.clone();

        let err = on_disk_pipeline(inputs.config.clone(), RecordingToolRunner::new().materializing())
            .run()
            .await
            .unwrap_err();

        assert!(err.is_precondition());
        assert!(!out.exists());
    }
}
