//! Geometry primitives shared by the export and import paths.
//!
//! All coordinates are expressed in source-image pixel space (full
//! resolution). Downsampling only affects the exported tiles, never the
//! coordinates exchanged with the external process or stored on
//! annotations.

use serde::{Deserialize, Serialize};

// =============================================================================
// Region Bounds
// =============================================================================

/// Integer pixel bounding box of a region of interest.
///
/// The origin may be negative (selections can extend past the image edge),
/// the extent is always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    /// X coordinate of the top-left corner
    pub x: i32,

    /// Y coordinate of the top-left corner
    pub y: i32,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl RegionBounds {
    /// Create bounds from integer pixel coordinates.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create bounds from floating-point coordinates, rounding to the
    /// nearest pixel. Negative extents collapse to zero.
    pub fn from_f64(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
            width: width.round().max(0.0) as u32,
            height: height.round().max(0.0) as u32,
        }
    }

    /// Whether the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

// =============================================================================
// Polygon
// =============================================================================

/// A polygon with one exterior ring and zero or more interior rings (holes).
///
/// Ring coordinates are `[x, y]` pairs. Rings are used as parsed; closing
/// the ring (first point repeated last) is the producer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Outer boundary of the polygon
    pub exterior: Vec<[f64; 2]>,

    /// Interior rings cut out of the polygon
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    /// Polygon from an exterior ring with no holes.
    pub fn from_exterior(exterior: Vec<[f64; 2]>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Axis-aligned rectangle polygon covering `bounds`.
    pub fn from_bounds(bounds: RegionBounds) -> Self {
        let x0 = f64::from(bounds.x);
        let y0 = f64::from(bounds.y);
        let x1 = x0 + f64::from(bounds.width);
        let y1 = y0 + f64::from(bounds.height);
        Self::from_exterior(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]])
    }

    /// Total number of vertices across all rings.
    pub fn vertex_count(&self) -> usize {
        self.exterior.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }
}

// =============================================================================
// Tests
// =============================================================================
