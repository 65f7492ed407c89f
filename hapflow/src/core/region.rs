//! Samtools-style region strings.

use crate::errors::{HapflowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A genomic region: a whole contig, or a zero-based, end-exclusive span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Reference sequence name.
    pub ref_name: String,
    /// Start coordinate, if bounded.
    pub start: Option<u64>,
    /// End coordinate, if bounded.
    pub end: Option<u64>,
}

impl Region {
    /// Creates a region covering a whole contig.
    #[must_use]
    pub fn contig(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            start: None,
            end: None,
        }
    }

    /// Creates a bounded region.
    #[must_use]
    pub fn span(ref_name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            ref_name: ref_name.into(),
            start: Some(start),
            end: Some(end),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, _) => write!(f, "{}", self.ref_name),
            (Some(start), None) => write!(f, "{}:{start}-", self.ref_name),
            (Some(start), Some(end)) => write!(f, "{}:{start}-{end}", self.ref_name),
        }
    }
}

fn parse_coordinate(region: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| HapflowError::invalid_region(region, format!("'{value}' is not a coordinate")))
}

impl FromStr for Region {
    type Err = HapflowError;

    /// Parses `name`, `name:start-end`, `name:end`, `name:-end` or `name:start-`.
    fn from_str(region: &str) -> Result<Self> {
        let region = region.trim();
        if region.matches(':').count() > 1 {
            return Err(HapflowError::invalid_region(region, "more than one ':'"));
        }
        let Some((ref_name, bounds)) = region.split_once(':') else {
            if region.is_empty() {
                return Err(HapflowError::invalid_region(region, "empty region"));
            }
            return Ok(Self::contig(region));
        };

        if ref_name.is_empty() {
            return Err(HapflowError::invalid_region(region, "missing reference name"));
        }
        if bounds.is_empty() {
            return Err(HapflowError::invalid_region(region, "missing coordinates"));
        }

        let (start, end) = if let Some(end) = bounds.strip_prefix('-') {
            (0, Some(parse_coordinate(region, end)?))
        } else if !bounds.contains('-') {
            (0, Some(parse_coordinate(region, bounds)?))
        } else if let Some(start) = bounds.strip_suffix('-') {
            (parse_coordinate(region, start)?, None)
        } else {
            let (start, end) = bounds
                .split_once('-')
                .ok_or_else(|| HapflowError::invalid_region(region, "malformed coordinates"))?;
            (parse_coordinate(region, start)?, Some(parse_coordinate(region, end)?))
        };

        if let Some(end) = end {
            if end <= start {
                return Err(HapflowError::invalid_region(
                    region,
                    "end must be greater than start",
                ));
            }
        }

        Ok(Self {
            ref_name: ref_name.to_string(),
            start: Some(start),
            end,
        })
    }
}

/// Resolves region arguments.
///
/// A first argument naming an existing file is read as one region per line.
pub fn load_regions(args: &[String]) -> Result<Vec<Region>> {
    let Some(first) = args.first() else {
        return Ok(Vec::new());
    };

    let lines: Vec<String> = if Path::new(first).is_file() {
        std::fs::read_to_string(first)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    } else {
        args.to_vec()
    };

    lines.iter().map(|line| line.parse()).collect()
}
