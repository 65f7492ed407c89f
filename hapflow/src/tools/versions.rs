//! Probing installed tool versions against minimum requirements.

use super::{ToolInvocation, ToolPaths, ToolRunner};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+|\d+").expect("version pattern is valid"));

/// A dotted numeric version such as `1.9` or `0.6.5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolVersion(Vec<u32>);

impl ToolVersion {
    /// Creates a version from its components.
    #[must_use]
    pub fn new(parts: Vec<u32>) -> Self {
        Self(parts)
    }

    /// Extracts the first dotted version number from tool output.
    #[must_use]
    pub fn find_in(text: &str) -> Option<Self> {
        let first_line = text.lines().next()?;
        VERSION_PATTERN
            .find(first_line)
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl FromStr for ToolVersion {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('.').map(str::parse).collect::<Result<Vec<_>, _>>().map(Self)
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // missing components compare as zero, so 1.9 == 1.9.0
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// A tool the pipeline needs, with an optional minimum version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequirement {
    /// Display name.
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Minimum acceptable version; `None` only requires the tool to run.
    pub minimum: Option<ToolVersion>,
}

impl ToolRequirement {
    /// The tools a full pipeline run invokes.
    #[must_use]
    pub fn defaults(paths: &ToolPaths) -> Vec<Self> {
        let htslib = Some(ToolVersion::new(vec![1, 9]));
        vec![
            Self {
                name: "bgzip".to_string(),
                program: paths.bgzip.clone(),
                minimum: htslib.clone(),
            },
            Self {
                name: "medaka".to_string(),
                program: paths.medaka.clone(),
                minimum: None,
            },
            Self {
                name: "samtools".to_string(),
                program: paths.samtools.clone(),
                minimum: htslib.clone(),
            },
            Self {
                name: "tabix".to_string(),
                program: paths.tabix.clone(),
                minimum: htslib,
            },
            Self {
                name: "whatshap".to_string(),
                program: paths.whatshap.clone(),
                minimum: None,
            },
        ]
    }
}

/// The probe result for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCheck {
    /// What was required.
    pub requirement: ToolRequirement,
    /// The version found, if the tool ran and reported one.
    pub found: Option<ToolVersion>,
    /// Whether the requirement is met.
    pub pass: bool,
}

/// Probe results for every required tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolReport {
    /// One entry per requirement, in requirement order.
    pub checks: Vec<ToolCheck>,
}

impl ToolReport {
    /// Returns true if every requirement is met.
    #[must_use]
    pub fn all_good(&self) -> bool {
        self.checks.iter().all(|c| c.pass)
    }

    /// Renders the result as a fixed-width table.
    #[must_use]
    pub fn render_table(&self) -> String {
        const WIDTH: usize = 9;
        let row = |cols: [&str; 4]| {
            cols.iter()
                .map(|c| format!("{c:<WIDTH$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = vec![row(["Program", "Version", "Required", "Pass"])];
        for check in &self.checks {
            let found = check
                .found
                .as_ref()
                .map_or_else(|| "Not found".to_string(), ToString::to_string);
            let required = check
                .requirement
                .minimum
                .as_ref()
                .map_or_else(|| "any".to_string(), ToString::to_string);
            let pass = if check.pass { "True" } else { "False" };
            lines.push(row([&check.requirement.name, &found, &required, pass]));
        }
        lines.join("\n")
    }
}

/// Runs `<program> --version` for each requirement and compares.
pub async fn check_tools(runner: &dyn ToolRunner, requirements: Vec<ToolRequirement>) -> ToolReport {
    let mut checks = Vec::with_capacity(requirements.len());

    for requirement in requirements {
        let invocation = ToolInvocation::new(&requirement.program)
            .arg("--version")
            .capture_stdout();
        let found = match runner.run(&invocation).await {
            Ok(exit) if exit.is_success() => ToolVersion::find_in(&exit.stdout),
            Ok(_) | Err(_) => None,
        };
        let pass = match (&found, &requirement.minimum) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(found), Some(minimum)) => found >= minimum,
        };
        tracing::debug!(tool = %requirement.name, ?found, pass, "Probed tool version");
        checks.push(ToolCheck {
            requirement,
            found,
            pass,
        });
    }

    ToolReport { checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolFailure;
    use crate::tools::runner::MockToolRunner;
    use crate::tools::ToolExit;

    #[test]
    fn test_find_version_in_tool_output() {
        assert_eq!(ToolVersion::find_in("samtools 1.9\nUsing htslib 1.9"), Some(ToolVersion::new(vec![1, 9])));
        assert_eq!(ToolVersion::find_in("tabix (htslib) 1.10.2\n"), Some(ToolVersion::new(vec![1, 10, 2])));
        assert_eq!(ToolVersion::find_in("medaka 0.6.5"), Some(ToolVersion::new(vec![0, 6, 5])));
        assert_eq!(ToolVersion::find_in("no digits here"), None);
        assert_eq!(ToolVersion::find_in(""), None);
    }

    #[test]
    fn test_version_ordering() {
        let v = |s: &str| s.parse::<ToolVersion>().unwrap();
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.9") >= v("1.9.0"));
        assert!(v("1.8.9") < v("1.9"));
        assert_eq!(v("2.11").to_string(), "2.11");
    }

    #[tokio::test]
    async fn test_check_tools_report() {
        let mut runner = MockToolRunner::new();
        runner.expect_run().returning(|inv| match inv.program.as_str() {
            "samtools" => Ok(ToolExit {
                code: Some(0),
                stdout: "samtools 1.8\n".to_string(),
            }),
            "tabix" => Ok(ToolExit {
                code: Some(0),
                stdout: "tabix (htslib) 1.9\n".to_string(),
            }),
            "bgzip" => Ok(ToolExit {
                code: Some(0),
                stdout: "bgzip (htslib) 1.10\n".to_string(),
            }),
            "whatshap" => Err(ToolFailure::launch("whatshap", "No such file or directory")),
            _ => Ok(ToolExit {
                code: Some(0),
                stdout: "1.0.0\n".to_string(),
            }),
        });

        let report = check_tools(&runner, ToolRequirement::defaults(&ToolPaths::default())).await;
        let pass: Vec<(&str, bool)> = report
            .checks
            .iter()
            .map(|c| (c.requirement.name.as_str(), c.pass))
            .collect();

        assert_eq!(
            pass,
            vec![
                ("bgzip", true),
                ("medaka", true),
                ("samtools", false),
                ("tabix", true),
                ("whatshap", false),
            ]
        );
        assert!(!report.all_good());

        let table = report.render_table();
        assert!(table.starts_with("Program"));
        assert!(table.contains("Not found"));
    }
}
