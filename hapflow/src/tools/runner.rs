//! Executing tool invocations.

use super::{StdoutMode, ToolExit, ToolInvocation};
use crate::errors::ToolFailure;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs external tools. The driver judges a tool only by its exit status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// A tool that starts and exits (with any status) is `Ok`; only a
    /// failure to start is `Err`.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolExit, ToolFailure>;
}

/// Runs tools as child processes, blocking the caller until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolRunner;

impl ProcessToolRunner {
    /// Creates a new process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolExit, ToolFailure> {
        let launch_error = |err: std::io::Error| ToolFailure::launch(&invocation.program, err.to_string());

        debug!(command = %invocation, "Launching tool");
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);

        match &invocation.stdout {
            StdoutMode::Inherit => {
                let status = command.status().await.map_err(launch_error)?;
                Ok(ToolExit {
                    code: status.code(),
                    stdout: String::new(),
                })
            }
            StdoutMode::File(path) => {
                let file = tokio::fs::File::create(path)
                    .await
                    .map_err(launch_error)?
                    .into_std()
                    .await;
                let status = command
                    .stdout(Stdio::from(file))
                    .status()
                    .await
                    .map_err(launch_error)?;
                Ok(ToolExit {
                    code: status.code(),
                    stdout: String::new(),
                })
            }
            StdoutMode::Capture => {
                let output = command
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .output()
                    .await
                    .map_err(launch_error)?;
                Ok(ToolExit {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                })
            }
        }
    }
}
