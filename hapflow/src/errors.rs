//! Error types for the hapflow pipeline.
//!
//! Every failure aborts the whole run. The taxonomy separates precondition
//! failures (a required artifact is absent), external tool failures, cleanup
//! failures, and configuration problems detected before any stage runs.

use crate::core::StageKind;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HapflowError>;

/// The main error type for hapflow operations.
#[derive(Debug, Error)]
pub enum HapflowError {
    /// A required input artifact (or its companion index) is absent.
    #[error("File not found: {} (required by {stage})", path.display())]
    FileNotFound {
        /// The stage whose precondition failed.
        stage: String,
        /// The missing file.
        path: PathBuf,
    },

    /// An external tool exited unsuccessfully.
    #[error("{} ({stage} producing {artifact}): {cause}", kind.failure_message())]
    StageFailed {
        /// The stage name.
        stage: String,
        /// The kind of operation the stage performs.
        kind: StageKind,
        /// The artifact the stage was producing.
        artifact: String,
        /// What went wrong with the tool.
        cause: ToolFailure,
    },

    /// One or more intermediate files could not be deleted.
    #[error("Failed to delete intermediate files: {}", format_failures(failures))]
    Cleanup {
        /// Paths that could not be removed, with the reason.
        failures: Vec<(PathBuf, String)>,
    },

    /// A region string could not be parsed.
    #[error("Invalid region '{region}': {reason}")]
    InvalidRegion {
        /// The offending region string.
        region: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The pipeline configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generic internal error (a malformed stage description).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_failures(failures: &[(PathBuf, String)]) -> String {
    failures
        .iter()
        .map(|(path, reason)| format!("{} ({reason})", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for HapflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl HapflowError {
    /// Creates a file-not-found precondition error.
    #[must_use]
    pub fn file_not_found(stage: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound {
            stage: stage.into(),
            path: path.into(),
        }
    }

    /// Creates an invalid region error.
    #[must_use]
    pub fn invalid_region(region: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegion {
            region: region.into(),
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns a stable error code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "PRECONDITION-FILE-NOT-FOUND",
            Self::StageFailed { .. } => "STAGE-FAILED",
            Self::Cleanup { .. } => "CLEANUP-FAILED",
            Self::InvalidRegion { .. } => "CONFIG-INVALID-REGION",
            Self::Config(_) => "CONFIG-INVALID",
            Self::Internal(_) => "INTERNAL",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Io(_) => "IO",
        }
    }

    /// Returns true if the error is a missing-input precondition failure.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::FileNotFound { stage, path } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("path".to_string(), serde_json::json!(path.display().to_string()));
            }
            Self::StageFailed {
                stage,
                kind,
                artifact,
                cause,
            } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("kind".to_string(), serde_json::json!(kind.to_string()));
                map.insert("artifact".to_string(), serde_json::json!(artifact));
                map.insert("cause".to_string(), serde_json::json!(cause.to_string()));
            }
            Self::Cleanup { failures } => {
                let paths: Vec<String> = failures
                    .iter()
                    .map(|(path, _)| path.display().to_string())
                    .collect();
                map.insert("paths".to_string(), serde_json::json!(paths));
            }
            Self::InvalidRegion { region, .. } => {
                map.insert("region".to_string(), serde_json::json!(region));
            }
            Self::Config(_) | Self::Internal(_) | Self::Serialization(_) | Self::Io(_) => {}
        }

        map
    }
}

/// Why an external tool invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolFailure {
    /// The tool ran and exited with a nonzero status.
    #[error("{program} exited with status {code}")]
    NonZeroExit {
        /// The program name.
        program: String,
        /// The exit code.
        code: i32,
    },

    /// The tool was terminated without an exit code (e.g. by a signal).
    #[error("{program} was terminated without an exit status")]
    Terminated {
        /// The program name.
        program: String,
    },

    /// The tool could not be started at all.
    #[error("could not launch {program}: {reason}")]
    Launch {
        /// The program name.
        program: String,
        /// The launch error.
        reason: String,
    },
}

impl ToolFailure {
    /// Creates a launch failure.
    #[must_use]
    pub fn launch(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Launch {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Returns the program that failed.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::NonZeroExit { program, .. }
            | Self::Terminated { program }
            | Self::Launch { program, .. } => program,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message() {
        let err = HapflowError::file_not_found("input validation", "/data/reads.bam.bai");

        assert!(err.to_string().starts_with("File not found: /data/reads.bam.bai"));
        assert!(err.is_precondition());
        assert_eq!(err.code(), "PRECONDITION-FILE-NOT-FOUND");
    }

    #[test]
    fn test_stage_failed_names_stage_and_artifact() {
        let err = HapflowError::StageFailed {
            stage: "round_0_consensus_mixed".to_string(),
            kind: StageKind::Consensus,
            artifact: "round_0_hap_mixed_probs.hdf".to_string(),
            cause: ToolFailure::NonZeroExit {
                program: "medaka".to_string(),
                code: 1,
            },
        };

        let message = err.to_string();
        assert!(message.starts_with("Failed to run medaka consensus."));
        assert!(message.contains("round_0_consensus_mixed"));
        assert!(message.contains("round_0_hap_mixed_probs.hdf"));
        assert!(message.contains("medaka exited with status 1"));
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_stage_failed_to_dict() {
        let err = HapflowError::StageFailed {
            stage: "compress".to_string(),
            kind: StageKind::Compress,
            artifact: "round_0_hap_mixed_phased.vcf.gz".to_string(),
            cause: ToolFailure::Terminated {
                program: "bgzip".to_string(),
            },
        };

        let dict = err.to_dict();
        assert_eq!(dict.get("code").unwrap(), "STAGE-FAILED");
        assert_eq!(dict.get("kind").unwrap(), "compress");
        assert_eq!(dict.get("artifact").unwrap(), "round_0_hap_mixed_phased.vcf.gz");
    }

    #[test]
    fn test_cleanup_error_lists_paths() {
        let err = HapflowError::Cleanup {
            failures: vec![
                (PathBuf::from("out/a.hdf"), "permission denied".to_string()),
                (PathBuf::from("out/b.bam"), "busy".to_string()),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("out/a.hdf (permission denied)"));
        assert!(message.contains("out/b.bam (busy)"));
    }

    #[test]
    fn test_tool_failure_program() {
        assert_eq!(ToolFailure::launch("whatshap", "not found").program(), "whatshap");
    }
}
