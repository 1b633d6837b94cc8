//! Inference process runner.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::ProcessError;
use crate::export::TileExportSpec;
use crate::layout::InferenceLayout;

use super::exchange::{failure_reason, success_summary};
use super::invoker::{CommandInvoker, CommandSpec, ProcessOutput};

/// Program the inference script is launched through.
pub const RUNNER_PROGRAM: &str = "uv";

/// Subcommand of [`RUNNER_PROGRAM`] that executes a script in its
/// managed environment.
pub const RUNNER_SUBCOMMAND: &str = "run";

// =============================================================================
// Run Report
// =============================================================================

/// Child process output together with its measured wall time.
#[derive(Debug, Clone)]
pub struct TimedOutput {
    /// Captured exit code, stdout and stderr
    pub output: ProcessOutput,

    /// Wall time from spawn to exit, in seconds
    pub elapsed_seconds: f64,
}

/// Verified-successful inference run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One-line success message for the user
    pub message: String,

    /// Polygon count reported by the child, when present
    pub polygon_count: Option<u64>,

    /// Wall time of the child process in seconds
    pub elapsed_seconds: f64,

    /// Path of the result artifact, verified to exist
    pub result_file: PathBuf,
}

// =============================================================================
// Process Runner
// =============================================================================

/// Runs the external segmentation command and interprets its result.
///
/// Generic over the [`CommandInvoker`] so tests exercise the full
/// classification logic without spawning real processes.
pub struct ProcessRunner<I> {
    invoker: I,
}

impl<I: CommandInvoker> ProcessRunner<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    /// Build the child command with the fixed, versioned flag set.
    fn build_command(
        layout: &InferenceLayout,
        script: &Path,
        model_path: &Path,
        spec: &TileExportSpec,
        confidence: f64,
    ) -> CommandSpec {
        let region = spec.region();
        CommandSpec::new(RUNNER_PROGRAM, layout.repo_dir())
            .arg(RUNNER_SUBCOMMAND)
            .arg(script.display().to_string())
            .flag("--model-path", model_path.display().to_string())
            .flag("--tile-dir", layout.tile_scratch().display().to_string())
            .flag(
                "--output-dir",
                layout.output_scratch().display().to_string(),
            )
            .flag("--roi-x", region.x.to_string())
            .flag("--roi-y", region.y.to_string())
            .flag("--roi-width", region.width.to_string())
            .flag("--roi-height", region.height.to_string())
            .flag("--downsample-rate", spec.downsample_factor().to_string())
            .flag("--tile-size", spec.tile_size().to_string())
            .flag("--confidence", confidence.to_string())
            .flag(
                "--log-file",
                layout.inference_log_path().display().to_string(),
            )
    }

    /// Spawn the inference command and wait for it to exit.
    ///
    /// The exchange is filesystem-based, so tiles must be fully exported
    /// before this is called. Blocks the calling task until the child
    /// exits; there is no timeout.
    ///
    /// # Errors
    ///
    /// [`ProcessError::ScriptNotFound`] if the entry-point script is
    /// absent, [`ProcessError::Spawn`] if the runner program could not be
    /// started. A non-zero exit is not an error at this stage; it is
    /// classified by [`ProcessRunner::interpret`].
    pub async fn invoke(
        &self,
        layout: &InferenceLayout,
        model_path: &Path,
        spec: &TileExportSpec,
        confidence: f64,
    ) -> Result<TimedOutput, ProcessError> {
        let script = layout.script_path();
        if !script.is_file() {
            return Err(ProcessError::ScriptNotFound(script));
        }

        let command = Self::build_command(layout, &script, model_path, spec, confidence);

        info!("Starting inference.");
        let started = Instant::now();
        let output = self.invoker.invoke(&command).await?;
        let elapsed_seconds = started.elapsed().as_secs_f64();

        if !output.stderr.trim().is_empty() {
            warn!("Inference script stderr: {}", output.stderr.trim());
        }

        Ok(TimedOutput {
            output,
            elapsed_seconds,
        })
    }

    /// Classify a completed invocation.
    ///
    /// Success requires a zero exit *and* a result artifact present in
    /// the output directory; a zero exit without the artifact is
    /// [`ProcessError::MissingOutput`].
    pub fn interpret(
        &self,
        timed: &TimedOutput,
        layout: &InferenceLayout,
    ) -> Result<RunReport, ProcessError> {
        let output = &timed.output;
        let log_file = layout.inference_log_path();

        if !output.success() {
            error!(
                "Inference script failed with exit code {}",
                output.exit_code
            );
            return Err(ProcessError::Failed {
                reason: failure_reason(&output.stdout, &log_file),
                exit_code: output.exit_code,
                log_file,
            });
        }

        info!("Inference script successful.");
        let summary = success_summary(&output.stdout);

        let result_file = layout.result_path();
        if !result_file.is_file() {
            return Err(ProcessError::MissingOutput(result_file));
        }

        Ok(RunReport {
            message: summary.message,
            polygon_count: summary.polygon_count,
            elapsed_seconds: timed.elapsed_seconds,
            result_file,
        })
    }

    /// Invoke and interpret in one step.
    pub async fn run(
        &self,
        layout: &InferenceLayout,
        model_path: &Path,
        spec: &TileExportSpec,
        confidence: f64,
    ) -> Result<RunReport, ProcessError> {
        let timed = self.invoke(layout, model_path, spec, confidence).await?;
        self.interpret(&timed, layout)
    }
}

// =============================================================================
// Tests
// =============================================================================
