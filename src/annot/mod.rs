//! Annotation model and result import.
//!
//! A deliberately small tree of polygon annotations, shaped after the
//! host viewer's object model: each annotation may carry a name, a
//! classification, polygon geometry, a locked flag and child
//! annotations. Imported results are locked on arrival so downstream
//! edits must be explicit unlocks.

mod importer;

pub use importer::ResultImporter;

use serde_json::json;

use crate::geometry::{Polygon, RegionBounds};

// =============================================================================
// Annotation
// =============================================================================

/// A polygon annotation in the host's annotation tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    /// Display name
    pub name: Option<String>,

    /// Classification label, e.g. "Tumor"
    pub classification: Option<String>,

    /// Polygon geometry; more than one entry for multi-polygons
    pub polygons: Vec<Polygon>,

    /// Locked annotations are read-only until explicitly unlocked
    pub locked: bool,

    /// Child annotations attached below this one
    pub children: Vec<Annotation>,
}

impl Annotation {
    /// Rectangle annotation covering a selected region.
    pub fn from_region(bounds: RegionBounds) -> Self {
        Self {
            polygons: vec![Polygon::from_bounds(bounds)],
            ..Self::default()
        }
    }

    /// Mark this annotation read-only.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Number of directly attached children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Serialize this annotation and its children as a GeoJSON feature
    /// list (used by file-backed hosts to persist the tree).
    pub fn to_geojson_features(&self) -> Vec<serde_json::Value> {
        let mut features = vec![feature_of(self)];
        features.extend(self.children.iter().map(feature_of));
        features
    }
}

fn feature_of(annotation: &Annotation) -> serde_json::Value {
    let rings_of = |polygon: &Polygon| -> Vec<Vec<[f64; 2]>> {
        let mut rings = vec![polygon.exterior.clone()];
        rings.extend(polygon.holes.iter().cloned());
        rings
    };

    let geometry = if annotation.polygons.len() == 1 {
        json!({
            "type": "Polygon",
            "coordinates": rings_of(&annotation.polygons[0]),
        })
    } else {
        json!({
            "type": "MultiPolygon",
            "coordinates": annotation.polygons.iter().map(rings_of).collect::<Vec<_>>(),
        })
    };

    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "name": &annotation.name,
            "classification": &annotation.classification,
            "locked": annotation.locked,
        },
    })
}

// =============================================================================
// Annotation Batch
// =============================================================================

/// Ordered sequence of annotations parsed from one result artifact.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBatch {
    annotations: Vec<Annotation>,
}

impl AnnotationBatch {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self { annotations }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// Consume the batch, yielding its annotations in order.
    pub fn into_annotations(self) -> Vec<Annotation> {
        self.annotations
    }
}

// =============================================================================
// Tests
// =============================================================================
