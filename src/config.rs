//! Configuration for the inference pipeline.
//!
//! Settings are an explicit struct threaded into the orchestrator at call
//! time, never read from ambient globals. They can be populated from
//! command-line arguments via clap, from environment variables with the
//! `TSEG_` prefix, or constructed directly by a host application.
//!
//! # Environment Variables
//!
//! - `TSEG_TILE_SIZE` - Tile edge length in pixels (default: 512)
//! - `TSEG_TARGET_MPP` - Target resolution in µm/pixel (default: 1.0)
//! - `TSEG_TILE_OVERLAP` - Overlap fraction between tiles (default: 0.25)
//! - `TSEG_IMAGE_FORMAT` - Tile raster format (default: jpg)
//! - `TSEG_CONFIDENCE` - Confidence threshold (default: 0.5)
//! - `TSEG_DEFAULT_MODEL` - Model file name preselected for runs
//! - `TSEG_ROOT_DIR` - Name of the inference root directory
//! - `TSEG_REPO_DIR` - Name of the inference runtime repo directory
//! - `TSEG_BASE_DIR` - Base path the root is resolved under (default: home)

use std::path::PathBuf;

use clap::Args;

// =============================================================================
// Default Values
// =============================================================================

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default target resolution in micrometers per pixel.
pub const DEFAULT_TARGET_MPP: f64 = 1.0;

/// Default overlap fraction between neighboring tiles.
pub const DEFAULT_OVERLAP_FRACTION: f64 = 0.25;

/// Default tile raster format.
pub const DEFAULT_IMAGE_FORMAT: &str = "jpg";

/// Default confidence threshold handed to the model.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Default name of the inference root directory under the base path.
pub const DEFAULT_ROOT_DIR: &str = ".tseg";

/// Default name of the inference runtime repository under the root.
pub const DEFAULT_REPO_DIR: &str = "tseg-inference";

// =============================================================================
// Settings
// =============================================================================

/// User-tunable settings for tile export and inference.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Tile edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TSEG_TILE_SIZE")]
    pub tile_size: u32,

    /// Target resolution in micrometers per pixel.
    ///
    /// Together with the source image's pixel size this determines the
    /// downsample factor applied before tiling.
    #[arg(long, default_value_t = DEFAULT_TARGET_MPP, env = "TSEG_TARGET_MPP")]
    pub target_mpp: f64,

    /// Overlap fraction between neighboring tiles, in [0, 1).
    #[arg(long, default_value_t = DEFAULT_OVERLAP_FRACTION, env = "TSEG_TILE_OVERLAP")]
    pub overlap_fraction: f64,

    /// Raster format for exported tiles (extension without the dot).
    #[arg(long, default_value = DEFAULT_IMAGE_FORMAT, env = "TSEG_IMAGE_FORMAT")]
    pub image_format: String,

    /// Confidence threshold handed to the model, in [0, 1].
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE, env = "TSEG_CONFIDENCE")]
    pub confidence: f64,

    /// Model file name (inside the models directory) preselected for runs.
    #[arg(long, env = "TSEG_DEFAULT_MODEL")]
    pub default_model: Option<String>,

    /// Name of the inference root directory, resolved under the base path.
    #[arg(long, default_value = DEFAULT_ROOT_DIR, env = "TSEG_ROOT_DIR")]
    pub root_dir: String,

    /// Name of the inference runtime repository directory under the root.
    #[arg(long, default_value = DEFAULT_REPO_DIR, env = "TSEG_REPO_DIR")]
    pub repo_dir: String,

    /// Base path to resolve the root under.
    ///
    /// Defaults to the user home directory when not set.
    #[arg(long, env = "TSEG_BASE_DIR")]
    pub base_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            target_mpp: DEFAULT_TARGET_MPP,
            overlap_fraction: DEFAULT_OVERLAP_FRACTION,
            image_format: DEFAULT_IMAGE_FORMAT.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            default_model: None,
            root_dir: DEFAULT_ROOT_DIR.to_string(),
            repo_dir: DEFAULT_REPO_DIR.to_string(),
            base_dir: None,
        }
    }
}

impl Settings {
    /// Validate the settings and return an error message if invalid.
    ///
    /// This is a coarse check for the configuration surface; the export
    /// spec constructor revalidates everything it consumes.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }

        if !self.target_mpp.is_finite() || self.target_mpp <= 0.0 {
            return Err("target_mpp must be finite and greater than 0".to_string());
        }

        if !(0.0..1.0).contains(&self.overlap_fraction) {
            return Err("overlap_fraction must be in [0, 1)".to_string());
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err("confidence must be in [0, 1]".to_string());
        }

        if self.image_format.is_empty() || self.image_format.starts_with('.') {
            return Err(
                "image_format must be a bare extension, e.g. 'jpg' or 'png'".to_string(),
            );
        }

        if self.root_dir.is_empty() {
            return Err("root_dir must not be empty".to_string());
        }

        if self.repo_dir.is_empty() {
            return Err("repo_dir must not be empty".to_string());
        }

        Ok(())
    }

    /// The tile image format as a file extension with a leading dot.
    pub fn image_extension(&self) -> String {
        format!(".{}", self.image_format)
    }
}

// =============================================================================
// Tests
// =============================================================================
