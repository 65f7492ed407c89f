//! Command-line entry point for the haplotyping pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hapflow::config::PipelineConfig;
use hapflow::events::LoggingEventSink;
use hapflow::observability::{init_tracing, LogFormat};
use hapflow::pipeline::HaplotypingPipeline;
use hapflow::tools::{check_tools, ProcessToolRunner, ToolRequirement};

#[derive(Parser, Debug)]
#[command(
    name = "hapflow",
    version,
    about = "Haplotype-aware variant calling with medaka and whatshap"
)]
struct Cli {
    /// Input alignment (BAM). Its .bai index must exist.
    #[arg(short = 'i', long = "bam", value_name = "BAM")]
    bam: Option<PathBuf>,
    /// Reference sequence (FASTA).
    #[arg(short = 'f', long = "reference", value_name = "FASTA")]
    reference: Option<PathBuf>,
    /// Regions to analyse, or a single file listing one region per line.
    #[arg(short = 'r', long = "regions", value_name = "REGION", num_args = 1..)]
    regions: Vec<String>,
    /// Output directory.
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Consensus model.
    #[arg(short = 'm', long)]
    model: Option<String>,
    /// Threshold for considering a variant heterozygous in the first round.
    #[arg(short = 's', long = "het-threshold")]
    het_threshold: Option<f64>,
    /// Worker count passed to every tool.
    #[arg(short = 't', long)]
    threads: Option<usize>,
    /// Consensus batch size.
    #[arg(short = 'b', long = "batch-size")]
    batch_size: Option<usize>,
    /// Delete intermediate files, keeping only the final calls.
    #[arg(short = 'd', long = "delete-intermediates")]
    delete_intermediates: bool,
    /// JSON configuration file; flags override its values.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log line format: text or json.
    #[arg(long = "log-format", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    /// Report tool versions against requirements and exit.
    #[arg(long = "check-tools")]
    check_tools: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(bam) = self.bam {
            config.bam = bam;
        }
        if let Some(reference) = self.reference {
            config.reference = reference;
        }
        if !self.regions.is_empty() {
            config.regions = self.regions;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(threshold) = self.het_threshold {
            config.het_threshold = threshold;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.delete_intermediates {
            config.delete_intermediates = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.log_format) {
        eprintln!("Warning: {err}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let check = cli.check_tools;
    let config = cli.into_config()?;

    if check {
        let report = check_tools(&ProcessToolRunner::new(), ToolRequirement::defaults(&config.tools)).await;
        println!("{}", report.render_table());
        return Ok(if report.all_good() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let report = HaplotypingPipeline::from_config(config)
        .with_event_sink(Arc::new(LoggingEventSink::debug()))
        .run()
        .await
        .context("pipeline aborted")?;

    println!("Unphased calls: {}", report.final_unphased.display());
    println!("Phased calls: {}", report.final_phased.display());
    Ok(ExitCode::SUCCESS)
}
