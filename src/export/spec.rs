//! Tile export specification.

use crate::error::SpecError;
use crate::geometry::RegionBounds;

/// Partial tiles at the region border are exported rather than dropped.
///
/// The model sees the full selection this way; border padding is the
/// inference side's concern.
pub const INCLUDE_PARTIAL_TILES: bool = true;

/// Immutable specification for exporting a region as a grid of
/// overlapping tiles.
///
/// A spec is created per inference request from the current selection and
/// the user's calibration settings, then discarded after the export. All
/// numeric fields are validated at construction; an invalid value fails
/// [`TileExportSpec::new`] and no partially-built spec ever escapes.
#[derive(Debug, Clone, PartialEq)]
pub struct TileExportSpec {
    region: RegionBounds,
    target_mpp: f64,
    source_mpp: f64,
    tile_size: u32,
    overlap_fraction: f64,
    image_extension: String,
}

impl TileExportSpec {
    /// Build a validated export spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] if the region is empty, either resolution is
    /// not finite and positive, the tile size is zero, the overlap
    /// fraction falls outside `[0, 1)`, or the image extension does not
    /// start with a `.` separator.
    pub fn new(
        region: RegionBounds,
        target_mpp: f64,
        source_mpp: f64,
        tile_size: u32,
        overlap_fraction: f64,
        image_extension: impl Into<String>,
    ) -> Result<Self, SpecError> {
        if region.is_empty() {
            return Err(SpecError::EmptyRegion {
                width: region.width,
                height: region.height,
            });
        }

        if !target_mpp.is_finite()
            || !source_mpp.is_finite()
            || target_mpp <= 0.0
            || source_mpp <= 0.0
        {
            return Err(SpecError::InvalidResolution {
                target: target_mpp,
                source_mpp,
            });
        }

        if tile_size == 0 {
            return Err(SpecError::ZeroTileSize);
        }

        // NaN fails the range check as well.
        if !(0.0..1.0).contains(&overlap_fraction) {
            return Err(SpecError::OverlapOutOfRange(overlap_fraction));
        }

        let image_extension = image_extension.into();
        if !image_extension.starts_with('.') || image_extension.len() < 2 {
            return Err(SpecError::MalformedImageFormat(image_extension));
        }

        Ok(Self {
            region,
            target_mpp,
            source_mpp,
            tile_size,
            overlap_fraction,
            image_extension,
        })
    }

    /// The region to export, in source-image pixel space.
    pub fn region(&self) -> RegionBounds {
        self.region
    }

    /// Target resolution in micrometers per pixel.
    pub fn target_mpp(&self) -> f64 {
        self.target_mpp
    }

    /// Source image resolution in micrometers per pixel.
    pub fn source_mpp(&self) -> f64 {
        self.source_mpp
    }

    /// Tile edge length in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Overlap fraction between neighboring tiles.
    pub fn overlap_fraction(&self) -> f64 {
        self.overlap_fraction
    }

    /// Tile file extension, including the leading dot.
    pub fn image_extension(&self) -> &str {
        &self.image_extension
    }

    /// Downsample factor applied before tiling.
    ///
    /// Exactly `target_mpp / source_mpp`: exporting at a coarser target
    /// resolution than the source shrinks the image by this factor.
    pub fn downsample_factor(&self) -> f64 {
        self.target_mpp / self.source_mpp
    }

    /// Overlap between neighboring tiles in whole pixels.
    ///
    /// `tile_size * overlap_fraction` rounded to the nearest integer,
    /// half away from zero (`f64::round`); ties are never truncated.
    /// Clamped below `tile_size` so each tile always advances by at
    /// least one pixel.
    pub fn overlap_pixels(&self) -> u32 {
        let rounded = (f64::from(self.tile_size) * self.overlap_fraction).round() as u32;
        rounded.min(self.tile_size - 1)
    }
}

// =============================================================================
// Tests
// =============================================================================
