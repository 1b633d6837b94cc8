//! # TSEG Runner
//!
//! Inference orchestration for tumor segmentation on Whole Slide Images.
//!
//! This library takes a user-selected region of a large microscopy image,
//! exports it as a grid of overlapping tiles, drives an external
//! segmentation process over a file-based exchange, and imports the
//! resulting polygons back into the host's annotation tree as locked
//! annotations.
//!
//! ## Features
//!
//! - **Validated tile geometry**: region + calibration in, downsample
//!   factor and pixel overlap out, with every parameter checked at
//!   construction
//! - **Fixed process contract**: explicit argument vector (never a
//!   shell), one JSON object on stdout, a verified result artifact on
//!   disk
//! - **Deterministic classification**: exit code, stdout JSON and
//!   artifact presence combine into a single user-facing outcome
//! - **Locked imports**: result polygons arrive read-only, attached under
//!   the originating selection, which is locked afterwards
//! - **Serialized runs**: the scratch directories are single-writer;
//!   concurrent run requests are rejected while one is in flight
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`export`] - Tile export specification and the exporter collaborator
//! - [`layout`] - Working-directory layout, model store and scratch cleanup
//! - [`process`] - External command invocation and result classification
//! - [`annot`] - Annotation model and result-artifact import
//! - [`host`] - Capability interface onto the host image viewer
//! - [`orchestrator`] - The run state machine tying it all together
//! - [`config`] - Settings surface (CLI, environment, defaults)
//!
//! ## Example
//!
//! ```rust,no_run
//! use tseg_runner::{
//!     InferenceLayout, InferenceOrchestrator, InferenceRequest, Settings,
//!     DirectoryTileExporter, TokioInvoker,
//! };
//! # use tseg_runner::host::{ImageHost, ImageInfo, Selection};
//! # struct Viewer;
//! # impl ImageHost for Viewer {
//! #     fn current_image(&self) -> Option<ImageInfo> { None }
//! #     fn selection(&self) -> Option<Selection> { None }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::default();
//!     let layout = InferenceLayout::resolve_from(&settings).unwrap();
//!
//!     let orchestrator = InferenceOrchestrator::new(
//!         Viewer,
//!         DirectoryTileExporter::new("/data/tiles"),
//!         TokioInvoker,
//!         layout.clone(),
//!         settings,
//!     );
//!
//!     let handle = orchestrator
//!         .try_start(InferenceRequest {
//!             model_path: layout.model_path("tumor.onnx"),
//!             target_mpp: 1.0,
//!             confidence: 0.5,
//!             region: None,
//!         })
//!         .unwrap();
//!
//!     let outcome = handle.outcome().await;
//!     println!("success: {}", outcome.is_success());
//! }
//! ```

pub mod annot;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod host;
pub mod layout;
pub mod orchestrator;
pub mod process;

// Re-export commonly used types
pub use annot::{Annotation, AnnotationBatch, ResultImporter};
pub use config::Settings;
pub use error::{
    ExportError, ImportError, InvokeError, LayoutError, ProcessError, RunError, SpecError,
};
pub use export::{DirectoryTileExporter, TileExportSpec, TileExporter, INCLUDE_PARTIAL_TILES};
pub use geometry::{Polygon, RegionBounds};
pub use host::{ImageHost, ImageInfo, Selection};
pub use layout::{clear_dir, clear_scratch, is_onnx_model, InferenceLayout};
pub use orchestrator::{
    InferenceOrchestrator, InferenceOutcome, InferenceRequest, RunHandle, RunState,
};
pub use process::{
    CommandInvoker, CommandSpec, ProcessOutput, ProcessRunner, RunReport, TimedOutput,
    TokioInvoker, RUNNER_PROGRAM, RUNNER_SUBCOMMAND,
};
