//! External tool integration.
//!
//! This module provides:
//! - Tool invocations and exit handling
//! - The process-backed tool runner
//! - The mapping from stage kinds to commands
//! - Version probing of installed tools

mod definitions;
mod invocation;
mod runner;
mod versions;

pub use definitions::{ToolPaths, ToolSet, ToolSettings};
pub use invocation::{StdoutMode, ToolExit, ToolInvocation};
pub use runner::{ProcessToolRunner, ToolRunner};
pub use versions::{check_tools, ToolCheck, ToolReport, ToolRequirement, ToolVersion};

#[cfg(test)]
pub(crate) use runner::MockToolRunner;
