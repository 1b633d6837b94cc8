//! Working-directory layout for inference runs.
//!
//! Everything the pipeline touches on disk lives under one configurable
//! root: the inference runtime repository, the model store, and the two
//! scratch directories used for the filesystem-based exchange with the
//! external process.
//!
//! ```text
//! <base>/<root>/
//! ├── <repo>/              inference runtime (installed by setup)
//! │   └── infer.py         entry-point script
//! ├── models/              user-added .onnx model files
//! ├── .roi/                tile scratch, cleared after each run
//! ├── .output/             result scratch, cleared after each run
//! │   └── polygons.geojson result artifact on success
//! ├── infer.log            log file written by the inference process
//! └── .setup_successful    setup-completion marker
//! ```
//!
//! The layout is resolved once per process lifetime and cached by the
//! caller. Directories persist across runs; only scratch *contents* are
//! transient.

mod cleanup;

pub use cleanup::{clear_dir, clear_scratch};

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::LayoutError;

// =============================================================================
// Well-Known Names
// =============================================================================

/// Directory holding user-added model files.
pub const MODELS_DIR: &str = "models";

/// Tile scratch directory, cleared after each run.
pub const TILE_SCRATCH_DIR: &str = ".roi";

/// Output scratch directory, cleared after each run.
pub const OUTPUT_SCRATCH_DIR: &str = ".output";

/// Marker file recording that environment setup completed.
pub const SETUP_MARKER_FILE: &str = ".setup_successful";

/// Log file the inference process appends to.
pub const INFERENCE_LOG_FILE: &str = "infer.log";

/// Entry-point script inside the repo directory.
pub const INFERENCE_SCRIPT_FILE: &str = "infer.py";

/// Result artifact the inference process must produce on success.
pub const RESULT_FILE: &str = "polygons.geojson";

/// Required extension for model files.
pub const MODEL_EXTENSION: &str = "onnx";

/// Whether a path names a model file in the supported format.
pub fn is_onnx_model(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
}

// =============================================================================
// Inference Layout
// =============================================================================

/// Resolved set of working directories for inference operations.
///
/// All directories exist once [`InferenceLayout::resolve`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceLayout {
    root: PathBuf,
    repo: PathBuf,
    models: PathBuf,
    tile_scratch: PathBuf,
    output_scratch: PathBuf,
}

impl InferenceLayout {
    /// Resolve the layout under `base`, creating any missing directory.
    ///
    /// Idempotent; safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::CreateDir`] if directory creation is denied.
    pub fn resolve(base: &Path, root_name: &str, repo_name: &str) -> Result<Self, LayoutError> {
        let root = base.join(root_name);
        let repo = root.join(repo_name);
        let models = root.join(MODELS_DIR);
        let tile_scratch = root.join(TILE_SCRATCH_DIR);
        let output_scratch = root.join(OUTPUT_SCRATCH_DIR);

        for dir in [&root, &repo, &models, &tile_scratch, &output_scratch] {
            std::fs::create_dir_all(dir).map_err(|source| LayoutError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            root,
            repo,
            models,
            tile_scratch,
            output_scratch,
        })
    }

    /// Resolve the layout from settings.
    ///
    /// Uses the configured base path, falling back to the user home
    /// directory.
    pub fn resolve_from(settings: &Settings) -> Result<Self, LayoutError> {
        let base = match &settings.base_dir {
            Some(base) => base.clone(),
            None => dirs::home_dir().ok_or(LayoutError::NoBaseDir)?,
        };
        Self::resolve(&base, &settings.root_dir, &settings.repo_dir)
    }

    /// Root of the inference working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Inference runtime repository directory.
    pub fn repo_dir(&self) -> &Path {
        &self.repo
    }

    /// Model store directory.
    pub fn models_dir(&self) -> &Path {
        &self.models
    }

    /// Tile scratch directory.
    pub fn tile_scratch(&self) -> &Path {
        &self.tile_scratch
    }

    /// Output scratch directory.
    pub fn output_scratch(&self) -> &Path {
        &self.output_scratch
    }

    /// Path of the inference log file.
    pub fn inference_log_path(&self) -> PathBuf {
        self.root.join(INFERENCE_LOG_FILE)
    }

    /// Path of the inference entry-point script.
    pub fn script_path(&self) -> PathBuf {
        self.repo.join(INFERENCE_SCRIPT_FILE)
    }

    /// Path the result artifact must appear at on success.
    pub fn result_path(&self) -> PathBuf {
        self.output_scratch.join(RESULT_FILE)
    }

    /// Path of the setup-completion marker file.
    pub fn setup_marker_path(&self) -> PathBuf {
        self.root.join(SETUP_MARKER_FILE)
    }

    /// Whether environment setup has completed for this root.
    pub fn has_completed_setup(&self) -> bool {
        self.setup_marker_path().is_file()
    }

    /// Resolve a model file name inside the model store.
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.models.join(name)
    }

    /// List model files in the store, sorted by file name.
    pub fn list_models(&self) -> Result<Vec<PathBuf>, LayoutError> {
        let entries = std::fs::read_dir(&self.models).map_err(|source| LayoutError::Io {
            path: self.models.clone(),
            source,
        })?;

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LayoutError::Io {
                path: self.models.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_onnx_model(&path) {
                models.push(path);
            }
        }
        models.sort();
        Ok(models)
    }

    /// Copy a model file into the store.
    ///
    /// # Errors
    ///
    /// Rejects files without the `.onnx` extension, sources that do not
    /// exist, and targets that already exist (models are never silently
    /// overwritten).
    pub fn add_model(&self, source: &Path) -> Result<PathBuf, LayoutError> {
        if !source.is_file() {
            return Err(LayoutError::ModelNotFound(source.to_path_buf()));
        }
        if !is_onnx_model(source) {
            return Err(LayoutError::UnsupportedModelFormat(source.to_path_buf()));
        }

        let file_name = source
            .file_name()
            .ok_or_else(|| LayoutError::ModelNotFound(source.to_path_buf()))?;
        let target = self.models.join(file_name);

        if target.exists() {
            return Err(LayoutError::ModelAlreadyExists(target));
        }

        std::fs::copy(source, &target).map_err(|io| LayoutError::Io {
            path: target.clone(),
            source: io,
        })?;
        Ok(target)
    }
}

// =============================================================================
// Tests
// =============================================================================
