//! Pipeline configuration.
//!
//! A [`PipelineConfig`] can be built in code with the `with_*` methods or
//! loaded from a JSON file; any field missing from the file takes its
//! default. The command line overlays its flags on top of a loaded file.

use crate::core::{load_regions, Region};
use crate::errors::{HapflowError, Result};
use crate::tools::{ToolPaths, ToolSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input alignment (BAM); its `.bai` index must exist alongside it.
    #[serde(default)]
    pub bam: PathBuf,
    /// Reference sequence (FASTA).
    #[serde(default)]
    pub reference: PathBuf,
    /// Region strings, or a single path to a file of regions.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Directory holding every produced artifact.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Consensus model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Calling threshold for the mixed-read round.
    #[serde(default = "default_het_threshold")]
    pub het_threshold: f64,
    /// Worker count passed to every tool that accepts one.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Consensus batch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Remove intermediates after a successful run.
    #[serde(default)]
    pub delete_intermediates: bool,
    /// External tool programs.
    #[serde(default)]
    pub tools: ToolPaths,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("medaka_variant")
}

fn default_model() -> String {
    "r941_min_high".to_string()
}

fn default_het_threshold() -> f64 {
    0.04
}

fn default_threads() -> usize {
    1
}

fn default_batch_size() -> usize {
    200
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bam: PathBuf::new(),
            reference: PathBuf::new(),
            regions: Vec::new(),
            output_dir: default_output_dir(),
            model: default_model(),
            het_threshold: default_het_threshold(),
            threads: default_threads(),
            batch_size: default_batch_size(),
            delete_intermediates: false,
            tools: ToolPaths::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for the given inputs with default settings.
    #[must_use]
    pub fn new(bam: impl Into<PathBuf>, reference: impl Into<PathBuf>) -> Self {
        Self {
            bam: bam.into(),
            reference: reference.into(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HapflowError::config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the region arguments.
    #[must_use]
    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the consensus model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the heterozygous calling threshold.
    #[must_use]
    pub fn with_het_threshold(mut self, threshold: f64) -> Self {
        self.het_threshold = threshold;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the consensus batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables or disables intermediate cleanup.
    #[must_use]
    pub fn with_delete_intermediates(mut self, delete: bool) -> Self {
        self.delete_intermediates = delete;
        self
    }

    /// Sets the tool programs.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// Checks every field that can be checked without touching the inputs.
    pub fn validate(&self) -> Result<()> {
        if self.bam.as_os_str().is_empty() {
            return Err(HapflowError::config("no input alignment given"));
        }
        if self.reference.as_os_str().is_empty() {
            return Err(HapflowError::config("no reference given"));
        }
        if !(self.het_threshold > 0.0 && self.het_threshold <= 1.0) {
            return Err(HapflowError::config(format!(
                "heterozygous threshold must be in (0, 1], got {}",
                self.het_threshold
            )));
        }
        if self.threads == 0 {
            return Err(HapflowError::config("thread count must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(HapflowError::config("batch size must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(HapflowError::config("model name must not be empty"));
        }
        self.parsed_regions()?;
        Ok(())
    }

    /// Parses the region arguments.
    pub fn parsed_regions(&self) -> Result<Vec<Region>> {
        load_regions(&self.regions)
    }

    /// Builds the settings passed to every tool.
    pub fn tool_settings(&self) -> Result<ToolSettings> {
        Ok(ToolSettings {
            model: self.model.clone(),
            batch_size: self.batch_size,
            threads: self.threads,
            regions: self.parsed_regions()?,
        })
    }
}
