//! Inference run orchestration.
//!
//! The orchestrator sequences one inference run end to end:
//!
//! ```text
//! Idle → ValidatingInput → ExportingTiles → Invoking
//!      → InterpretingResult → Importing → Cleaning → Done
//! ```
//!
//! with a terminal `Failed` reachable from every non-terminal state. The
//! whole sequence runs on one background task so the caller never blocks
//! on the child process; progress is published on a watch channel the UI
//! (or a test harness) subscribes to, and the final [`InferenceOutcome`]
//! is awaited through the returned [`RunHandle`].
//!
//! Runs are strictly serialized: the scratch directories are shared,
//! single-writer resources with no per-run namespace, so a second request
//! while one run is in flight is rejected as busy. Scratch eviction after
//! a run is detached from the run itself but retains the run permit, so
//! it can never interleave with the next run's tile export.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::annot::ResultImporter;
use crate::config::Settings;
use crate::error::{LayoutError, RunError};
use crate::export::{TileExportSpec, TileExporter};
use crate::geometry::RegionBounds;
use crate::host::ImageHost;
use crate::layout::{clear_scratch, is_onnx_model, InferenceLayout};
use crate::process::{CommandInvoker, ProcessRunner, RunReport};

// =============================================================================
// Run State
// =============================================================================

/// Observable state of the orchestrator's current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ValidatingInput,
    ExportingTiles,
    Invoking,
    InterpretingResult,
    Importing,
    Cleaning,
    Done,
    Failed,
}

impl RunState {
    /// Whether this state ends a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Idle | RunState::Done | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::ValidatingInput => "validating input",
            RunState::ExportingTiles => "exporting tiles",
            RunState::Invoking => "invoking",
            RunState::InterpretingResult => "interpreting result",
            RunState::Importing => "importing",
            RunState::Cleaning => "cleaning",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Request and Outcome
// =============================================================================

/// One user-initiated inference run. Consumed once.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Absolute path of the model file to run
    pub model_path: PathBuf,

    /// Target resolution in micrometers per pixel
    pub target_mpp: f64,

    /// Confidence threshold in [0, 1]
    pub confidence: f64,

    /// Region to process; defaults to the host's selection bounds
    pub region: Option<RegionBounds>,
}

/// Final result of an orchestrated run. Not persisted beyond the run.
#[derive(Debug, Clone)]
pub enum InferenceOutcome {
    Success {
        /// Number of annotations attached to the selection
        polygon_count: usize,

        /// Wall time of the child process in seconds
        elapsed_seconds: f64,

        /// Path of the consumed result artifact
        result_file: PathBuf,

        /// One-line message for the user
        message: String,
    },
    Failure {
        /// Single classified, user-facing reason
        reason: String,

        /// Exit code of the child, when one ran
        exit_code: Option<i32>,

        /// Log file to point the user at
        log_file: PathBuf,
    },
}

impl InferenceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InferenceOutcome::Success { .. })
    }
}

// =============================================================================
// Run Handle
// =============================================================================

/// Handle onto a started run: a state subscription plus the outcome.
pub struct RunHandle {
    states: watch::Receiver<RunState>,
    join: JoinHandle<InferenceOutcome>,
    log_file: PathBuf,
}

impl RunHandle {
    /// Subscribe to state transitions of this run.
    pub fn states(&self) -> watch::Receiver<RunState> {
        self.states.clone()
    }

    /// Wait for the run to finish and return its outcome.
    pub async fn outcome(self) -> InferenceOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            // The run task never panics by design; losing it still must
            // not take the caller down with an unwrap.
            Err(err) => InferenceOutcome::Failure {
                reason: format!("Inference task aborted: {err}"),
                exit_code: None,
                log_file: self.log_file,
            },
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

struct PipelineSuccess {
    imported: usize,
    report: RunReport,
}

struct Inner<H, E, I> {
    host: H,
    exporter: E,
    runner: ProcessRunner<I>,
    layout: InferenceLayout,
    settings: Settings,
    gate: Arc<Semaphore>,
    state_tx: watch::Sender<RunState>,
}

/// Sequences validation, tile export, process invocation, result import
/// and cleanup for inference runs, one at a time.
pub struct InferenceOrchestrator<H, E, I> {
    inner: Arc<Inner<H, E, I>>,
}

impl<H, E, I> InferenceOrchestrator<H, E, I>
where
    H: ImageHost + 'static,
    E: TileExporter + 'static,
    I: CommandInvoker + 'static,
{
    pub fn new(
        host: H,
        exporter: E,
        invoker: I,
        layout: InferenceLayout,
        settings: Settings,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            inner: Arc::new(Inner {
                host,
                exporter,
                runner: ProcessRunner::new(invoker),
                layout,
                settings,
                gate: Arc::new(Semaphore::new(1)),
                state_tx,
            }),
        }
    }

    /// Subscribe to orchestrator state, independent of any run.
    pub fn states(&self) -> watch::Receiver<RunState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether a run (or its trailing cleanup) currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.inner.gate.available_permits() == 0
    }

    /// Start a run on a background task and return immediately.
    ///
    /// # Errors
    ///
    /// [`RunError::Busy`] if a run is already in flight (or its scratch
    /// eviction has not finished). All other validation happens inside
    /// the run and surfaces through the outcome, so the state machine is
    /// observable for every failure mode.
    pub fn try_start(&self, request: InferenceRequest) -> Result<RunHandle, RunError> {
        let permit = self
            .inner
            .gate
            .clone()
            .try_acquire_owned()
            .map_err(|_| RunError::Busy)?;

        let states = self.inner.state_tx.subscribe();
        let log_file = self.inner.layout.inference_log_path();
        let inner = Arc::clone(&self.inner);

        let join = tokio::spawn(async move {
            let outcome = inner.execute(request).await;

            // Fire-and-forget scratch eviction. The permit moves into the
            // detached task so the next run cannot start while the shared
            // scratch directories are being swept; eviction failures are
            // logged inside clear_scratch and never surfaced.
            let layout = inner.layout.clone();
            tokio::spawn(async move {
                clear_scratch(&layout).await;
                drop(permit);
            });

            outcome
        });

        Ok(RunHandle {
            states,
            join,
            log_file,
        })
    }
}

impl<H, E, I> Inner<H, E, I>
where
    H: ImageHost,
    E: TileExporter,
    I: CommandInvoker,
{
    fn set_state(&self, state: RunState) {
        debug!("Run state: {state}");
        self.state_tx.send_replace(state);
    }

    async fn execute(&self, request: InferenceRequest) -> InferenceOutcome {
        match self.pipeline(&request).await {
            Ok(PipelineSuccess { imported, report }) => {
                self.set_state(RunState::Cleaning);
                info!("{}", report.message);
                self.set_state(RunState::Done);
                InferenceOutcome::Success {
                    polygon_count: imported,
                    elapsed_seconds: report.elapsed_seconds,
                    result_file: report.result_file,
                    message: report.message,
                }
            }
            Err(err) => {
                error!("Inference run failed: {err}");
                self.set_state(RunState::Failed);
                InferenceOutcome::Failure {
                    exit_code: err.exit_code(),
                    reason: err.to_string(),
                    log_file: self.layout.inference_log_path(),
                }
            }
        }
    }

    async fn pipeline(&self, request: &InferenceRequest) -> Result<PipelineSuccess, RunError> {
        self.set_state(RunState::ValidatingInput);

        if !(0.0..=1.0).contains(&request.confidence) {
            return Err(RunError::InvalidConfidence(request.confidence));
        }
        if !self.layout.has_completed_setup() {
            return Err(RunError::SetupIncomplete);
        }
        if !is_onnx_model(&request.model_path) {
            return Err(LayoutError::UnsupportedModelFormat(request.model_path.clone()).into());
        }
        if !request.model_path.is_file() {
            return Err(LayoutError::ModelNotFound(request.model_path.clone()).into());
        }

        let image = self.host.current_image().ok_or(RunError::NoImage)?;
        let selection = self.host.selection().ok_or(RunError::NoSelection)?;
        let bounds = request.region.unwrap_or(selection.bounds);

        let spec = TileExportSpec::new(
            bounds,
            request.target_mpp,
            image.pixel_size_um,
            self.settings.tile_size,
            self.settings.overlap_fraction,
            self.settings.image_extension(),
        )?;

        self.set_state(RunState::ExportingTiles);
        let tiles = self
            .exporter
            .export(&spec, self.layout.tile_scratch())
            .await?;
        debug!("Exported {tiles} tile(s) for inference.");

        self.set_state(RunState::Invoking);
        let timed = self
            .runner
            .invoke(&self.layout, &request.model_path, &spec, request.confidence)
            .await?;

        self.set_state(RunState::InterpretingResult);
        let report = self.runner.interpret(&timed, &self.layout)?;

        self.set_state(RunState::Importing);
        let imported = {
            let mut annotation = match selection.annotation.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            ResultImporter::import(&mut annotation, &report.result_file)?
        };

        Ok(PipelineSuccess { imported, report })
    }
}

// =============================================================================
// Tests
// =============================================================================
