//! External program execution
//!
//! Every transformation of firmware content happens in an external tool.
//! [`ToolGateway`] is the single seam through which the pipelines run them,
//! so tests can substitute a recording implementation.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Command;

use crate::error::ToolError;

/// A program and its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Start an invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add a single argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a path as an argument
    #[must_use]
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Full argument vector including the program
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Raw stdout bytes
    pub stdout: Vec<u8>,
    /// Stderr, lossily decoded
    pub stderr: String,
}

/// Runs one external program to completion
pub trait ToolGateway {
    /// Run `invocation`, returning captured output or a typed failure
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Gateway backed by `std::process::Command`
#[derive(Debug, Clone, Default)]
pub struct SystemGateway {
    search_path: Option<OsString>,
}

impl SystemGateway {
    /// Resolve programs through `PATH` only
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve programs through an explicit search path first
    pub fn with_search_path(search_path: OsString) -> Self {
        Self {
            search_path: Some(search_path),
        }
    }

    fn resolve(&self, program: &str) -> OsString {
        let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
        which::which_in(program, self.search_path.as_ref(), cwd)
            .map(OsString::from)
            .unwrap_or_else(|_| OsString::from(program))
    }
}

impl ToolGateway for SystemGateway {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        tracing::debug!("Running {}", invocation);

        let output = Command::new(self.resolve(invocation.program()))
            .args(invocation.arguments())
            .output()
            .map_err(|e| ToolError::Spawn {
                program: invocation.program().to_string(),
                error: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ToolError::NonZeroExit {
                command: invocation.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}
