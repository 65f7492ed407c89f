//! A fully assembled external command.

use crate::errors::ToolFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a tool's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdoutMode {
    /// Inherit the driver's stdout.
    Inherit,
    /// Redirect stdout into a file (e.g. `bgzip -c > out.gz`).
    File(PathBuf),
    /// Capture stdout for the caller (version probing).
    Capture,
}

/// One external command the driver will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// The program to execute.
    pub program: String,
    /// Arguments, already assembled.
    pub args: Vec<String>,
    /// Where stdout goes.
    pub stdout: StdoutMode,
    /// The file this invocation is expected to leave behind, if any.
    pub produces: Option<PathBuf>,
}

impl ToolInvocation {
    /// Creates an invocation with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: StdoutMode::Inherit,
            produces: None,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a path argument.
    #[must_use]
    pub fn path_arg(self, path: &std::path::Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Redirects stdout into `path`.
    #[must_use]
    pub fn stdout_to(mut self, path: PathBuf) -> Self {
        self.stdout = StdoutMode::File(path);
        self
    }

    /// Captures stdout.
    #[must_use]
    pub fn capture_stdout(mut self) -> Self {
        self.stdout = StdoutMode::Capture;
        self
    }

    /// Records the file this invocation produces.
    #[must_use]
    pub fn producing(mut self, path: PathBuf) -> Self {
        self.produces = Some(path);
        self
    }

    /// Returns the first argument, used to tell subcommands apart.
    #[must_use]
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let StdoutMode::File(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// How a finished tool exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit code, or `None` if the process was terminated.
    pub code: Option<i32>,
    /// Captured stdout (empty unless capture was requested).
    pub stdout: String,
}

impl ToolExit {
    /// A successful exit with no output.
    #[must_use]
    pub fn success() -> Self {
        Self {
            code: Some(0),
            stdout: String::new(),
        }
    }

    /// An exit with the given code.
    #[must_use]
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    /// Returns true if the tool exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a nonzero or missing exit status into a failure.
    pub fn check(self, program: &str) -> Result<Self, ToolFailure> {
        match self.code {
            Some(0) => Ok(self),
            Some(code) => Err(ToolFailure::NonZeroExit {
                program: program.to_string(),
                code,
            }),
            None => Err(ToolFailure::Terminated {
                program: program.to_string(),
            }),
        }
    }
}
