//! Host-application boundary.
//!
//! The image viewer owning the slide and its annotation tree is an
//! external collaborator, consumed as a narrow capability: report the
//! current image, report the current selection, and hand out the
//! selection's annotation object for the importer to attach results to.

use std::sync::{Arc, Mutex};

use crate::annot::Annotation;
use crate::geometry::RegionBounds;

/// Calibration metadata of the currently loaded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    /// Averaged pixel size in micrometers per pixel
    pub pixel_size_um: f64,

    /// Full-resolution width in pixels
    pub width: u32,

    /// Full-resolution height in pixels
    pub height: u32,
}

/// The user's current selection: its pixel bounds and the annotation
/// object imported results are attached under.
///
/// The annotation is shared with the host behind a mutex; the importer
/// holds the lock only for the duration of the attach.
#[derive(Debug, Clone)]
pub struct Selection {
    pub bounds: RegionBounds,
    pub annotation: Arc<Mutex<Annotation>>,
}

impl Selection {
    /// Selection whose annotation is a fresh rectangle over `bounds`.
    pub fn from_bounds(bounds: RegionBounds) -> Self {
        Self {
            bounds,
            annotation: Arc::new(Mutex::new(Annotation::from_region(bounds))),
        }
    }
}

/// Capability interface onto the host image viewer.
pub trait ImageHost: Send + Sync {
    /// The currently loaded image, if any.
    fn current_image(&self) -> Option<ImageInfo>;

    /// The current selection, if any.
    fn selection(&self) -> Option<Selection>;
}

// =============================================================================
// Tests
// =============================================================================
