//! Mockable command invocation seam.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use crate::error::InvokeError;

// =============================================================================
// Command Spec
// =============================================================================

/// A fully-resolved command: program, argument vector and working
/// directory.
///
/// Arguments are passed as an explicit vector and never interpreted by a
/// shell, so untrusted values (paths, user preferences) cannot inject
/// extra commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path, resolved via `PATH` by the OS
    pub program: String,

    /// Arguments in order, one element each
    pub args: Vec<String>,

    /// Working directory the child starts in
    pub cwd: PathBuf,
}

impl CommandSpec {
    /// Create a command with no arguments yet.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a `--flag value` pair.
    pub fn flag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.args.push(name.to_string());
        self.args.push(value.into());
        self
    }

    /// Value following the given flag, if present.
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == name)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

// =============================================================================
// Process Output
// =============================================================================

/// Captured result of a completed child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; -1 if the child was terminated by a signal
    pub exit_code: i32,

    /// Complete stdout, captured after exit
    pub stdout: String,

    /// Complete stderr, captured after exit
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the child exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// =============================================================================
// Command Invoker
// =============================================================================

/// Executes a command and captures its output.
///
/// The caller suspends until the child exits; there is no timeout, so a
/// hung child blocks its run indefinitely. Implementations other than
/// [`TokioInvoker`] exist for tests, which must never spawn real
/// processes.
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    /// Run the command to completion and capture exit code, stdout and
    /// stderr.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Spawn`] if the program could not be
    /// started; in that case no child process ever existed.
    async fn invoke(&self, command: &CommandSpec) -> Result<ProcessOutput, InvokeError>;
}

/// Real invoker backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioInvoker;

#[async_trait]
impl CommandInvoker for TokioInvoker {
    async fn invoke(&self, command: &CommandSpec) -> Result<ProcessOutput, InvokeError> {
        debug!(
            "Invoking '{}' with {} argument(s) in {}",
            command.program,
            command.args.len(),
            command.cwd.display()
        );

        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| InvokeError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        Ok(ProcessOutput {
            // A signal-terminated child has no code; report -1.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
