//! Test utilities for integration tests.
//!
//! Provides mock implementations of the collaborator seams (tile
//! exporter, command invoker, image host) plus helpers for building a
//! ready-to-run inference layout on disk. No test in this suite spawns a
//! real child process.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use tseg_runner::{
    host::{ImageHost, ImageInfo, Selection},
    CommandInvoker, CommandSpec, ExportError, InferenceLayout, InvokeError, ProcessOutput,
    RegionBounds, TileExportSpec, TileExporter,
};

// =============================================================================
// Event Log
// =============================================================================

/// Shared, ordered record of collaborator calls.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn push_event(log: &EventLog, event: &str) {
    log.lock().unwrap().push(event.to_string());
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

// =============================================================================
// Stub Tile Exporter
// =============================================================================

/// Tile exporter that writes `tiles` placeholder files into the
/// destination, or fails on demand.
pub struct StubExporter {
    pub tiles: usize,
    pub fail: bool,
    pub log: EventLog,
}

impl StubExporter {
    pub fn new(tiles: usize, log: EventLog) -> Self {
        Self {
            tiles,
            fail: false,
            log,
        }
    }

    pub fn failing(log: EventLog) -> Self {
        Self {
            tiles: 0,
            fail: true,
            log,
        }
    }
}

#[async_trait]
impl TileExporter for StubExporter {
    async fn export(&self, spec: &TileExportSpec, dest: &Path) -> Result<usize, ExportError> {
        push_event(&self.log, "export");
        if self.fail {
            return Err(ExportError::SourceNotFound(PathBuf::from("/missing")));
        }

        for i in 0..self.tiles {
            let name = format!("tile_{i}{}", spec.image_extension());
            tokio::fs::write(dest.join(name), b"tile").await?;
        }
        Ok(self.tiles)
    }
}

// =============================================================================
// Scripted Command Invoker
// =============================================================================

/// One canned response of the [`ScriptedInvoker`].
pub enum ScriptedResponse {
    /// Return this output; when `artifact` is set, also write it as
    /// `polygons.geojson` into the command's `--output-dir` first, the
    /// way a real child would.
    Output {
        output: ProcessOutput,
        artifact: Option<String>,
    },

    /// Fail as if the program did not exist.
    SpawnError,
}

/// Success response with the given stdout and optional artifact content.
pub fn respond_success(stdout: &str, artifact: Option<&str>) -> ScriptedResponse {
    ScriptedResponse::Output {
        output: ProcessOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        },
        artifact: artifact.map(str::to_string),
    }
}

/// Failure response with the given exit code and stdout.
pub fn respond_failure(exit_code: i32, stdout: &str) -> ScriptedResponse {
    ScriptedResponse::Output {
        output: ProcessOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: "stack trace here\n".to_string(),
        },
        artifact: None,
    }
}

/// Command invoker that replays canned responses and records every
/// invocation, never spawning a real process.
pub struct ScriptedInvoker {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    pub invocations: Arc<Mutex<Vec<CommandSpec>>>,
    pub log: EventLog,
    release: Option<Arc<Semaphore>>,
}

impl ScriptedInvoker {
    pub fn new(log: EventLog) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            invocations: Arc::new(Mutex::new(Vec::new())),
            log,
            release: None,
        }
    }

    /// Queue a response.
    pub fn respond(self, response: ScriptedResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Block each invocation until a permit is added to `release`,
    /// keeping the run observably in the `Invoking` state.
    pub fn with_release(mut self, release: Arc<Semaphore>) -> Self {
        self.release = Some(release);
        self
    }
}

#[async_trait]
impl CommandInvoker for ScriptedInvoker {
    async fn invoke(&self, command: &CommandSpec) -> Result<ProcessOutput, InvokeError> {
        push_event(&self.log, "invoke");
        self.invocations.lock().unwrap().push(command.clone());

        if let Some(release) = &self.release {
            let _permit = release.acquire().await.unwrap();
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left");

        match response {
            ScriptedResponse::Output { output, artifact } => {
                if let Some(content) = artifact {
                    let dir = command
                        .flag_value("--output-dir")
                        .expect("--output-dir flag missing");
                    std::fs::write(Path::new(dir).join("polygons.geojson"), content).unwrap();
                }
                Ok(output)
            }
            ScriptedResponse::SpawnError => Err(InvokeError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock spawn failure"),
            }),
        }
    }
}

// =============================================================================
// Fixture Host
// =============================================================================

/// Image host with a fixed image and selection.
pub struct FixtureHost {
    pub image: Option<ImageInfo>,
    pub selection: Option<Selection>,
}

impl FixtureHost {
    /// Host with a 0.25 µm/px image and a selection over `bounds`.
    pub fn with_selection(bounds: RegionBounds) -> Self {
        Self {
            image: Some(ImageInfo {
                pixel_size_um: 0.25,
                width: 40_000,
                height: 30_000,
            }),
            selection: Some(Selection::from_bounds(bounds)),
        }
    }

    /// Host with no image and no selection.
    pub fn empty() -> Self {
        Self {
            image: None,
            selection: None,
        }
    }

    /// Host with an image but nothing selected.
    pub fn without_selection() -> Self {
        Self {
            selection: None,
            ..Self::with_selection(RegionBounds::new(0, 0, 1, 1))
        }
    }
}

impl ImageHost for FixtureHost {
    fn current_image(&self) -> Option<ImageInfo> {
        self.image
    }

    fn selection(&self) -> Option<Selection> {
        self.selection.clone()
    }
}

// =============================================================================
// Layout Helpers
// =============================================================================

/// Resolve a layout under `base` with the setup marker and inference
/// script in place, ready for a run.
pub fn ready_layout(base: &Path) -> InferenceLayout {
    let layout = InferenceLayout::resolve(base, ".tseg", "tseg-inference").unwrap();
    std::fs::write(layout.setup_marker_path(), b"").unwrap();
    std::fs::write(layout.script_path(), b"# inference entry point\n").unwrap();
    layout
}

/// Install a placeholder model file into the layout's model store.
pub fn install_model(layout: &InferenceLayout) -> PathBuf {
    let path = layout.model_path("tumor.onnx");
    std::fs::write(&path, b"weights").unwrap();
    path
}

/// A FeatureCollection with `n` triangle polygons classified as Tumor.
pub fn sample_geojson(n: usize) -> String {
    let features: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            let o = (i * 10) as f64;
            serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[o, o], [o + 5.0, o], [o + 5.0, o + 5.0], [o, o]]]
                },
                "properties": {"classification": {"name": "Tumor"}}
            })
        })
        .collect();

    serde_json::json!({"type": "FeatureCollection", "features": features}).to_string()
}
