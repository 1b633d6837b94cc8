use std::path::PathBuf;

use thiserror::Error;

/// Validation errors raised while building a tile export specification.
///
/// All of these are caught at construction time, before any I/O happens.
#[derive(Debug, Clone, Error)]
pub enum SpecError {
    /// Region has zero width or height
    #[error("Region is empty: {width}x{height}")]
    EmptyRegion { width: u32, height: u32 },

    /// Either resolution is zero, negative or not finite
    #[error("Resolutions must be finite and > 0: target {target}, source {source_mpp}")]
    InvalidResolution { target: f64, source_mpp: f64 },

    /// Tile size must be at least one pixel
    #[error("Tile size must be > 0")]
    ZeroTileSize,

    /// Overlap fraction outside the half-open interval [0, 1)
    #[error("Overlap fraction must be in [0, 1), got {0}")]
    OverlapOutOfRange(f64),

    /// Image format must be an extension-like string, e.g. ".jpg"
    #[error("Image format must be an extension starting with '.', got {0:?}")]
    MalformedImageFormat(String),
}

/// Errors from resolving or maintaining the working-directory layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// No home directory to place the default inference root under
    #[error("No home directory available to place the inference root")]
    NoBaseDir,

    /// Directory creation was denied or otherwise failed
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A model file that was expected to exist does not
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// Model files must carry the .onnx extension
    #[error("Unsupported model format (expected .onnx): {0}")]
    UnsupportedModelFormat(PathBuf),

    /// Refusing to overwrite a model already present in the store
    #[error("Model already exists at {0}")]
    ModelAlreadyExists(PathBuf),

    /// Any other filesystem failure inside the layout
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the tile export collaborator.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Tile source directory is missing or not a directory
    #[error("Tile source directory not found: {0}")]
    SourceNotFound(PathBuf),

    /// The source directory held no tiles matching the requested format
    #[error("No '{extension}' tiles found in {dir}")]
    NoTiles { dir: PathBuf, extension: String },

    /// Filesystem failure while staging tiles
    #[error("I/O error while exporting tiles: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from spawning the external command.
///
/// A spawn failure means no child process ever started.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The executable could not be started (missing, not executable, ...)
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from running and interpreting the inference process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The inference script is absent from the repo directory
    #[error("Inference script not found at {0}")]
    ScriptNotFound(PathBuf),

    /// The child process could not be spawned
    #[error(transparent)]
    Spawn(#[from] InvokeError),

    /// Non-zero exit; `reason` is the classified user-facing message
    #[error("{reason}")]
    Failed {
        reason: String,
        exit_code: i32,
        log_file: PathBuf,
    },

    /// Zero exit but the result artifact is absent from the output directory
    #[error("Inference finished, but output file not found: {0}")]
    MissingOutput(PathBuf),
}

/// Errors from importing a result artifact into the annotation tree.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The result file does not exist
    #[error("Result file not found: {0}")]
    NotFound(PathBuf),

    /// The result file is not valid JSON or not a feature collection
    #[error("Malformed result file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The result file parsed, but carries a geometry we do not accept
    #[error("Unsupported geometry: {0}")]
    Geometry(String),

    /// Filesystem failure while reading the result file
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for an orchestrated inference run.
///
/// Each variant maps to a transition into the `Failed` state; the display
/// string is the single user-facing message for the failure.
#[derive(Debug, Error)]
pub enum RunError {
    /// Another run currently occupies the scratch directories
    #[error("An inference run is already in progress")]
    Busy,

    /// No image is loaded in the host
    #[error("No image loaded")]
    NoImage,

    /// No region is selected in the host
    #[error("No region selected")]
    NoSelection,

    /// The setup-completion marker is absent from the inference root
    #[error("Inference environment setup has not completed")]
    SetupIncomplete,

    /// Confidence threshold outside [0, 1]
    #[error("Confidence threshold must be in [0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl RunError {
    /// Exit code of the external process, when the failure carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::Process(ProcessError::Failed { exit_code, .. }) => Some(*exit_code),
            _ => None,
        }
    }
}
