//! Result artifact import.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ImportError;
use crate::geometry::Polygon;

use super::{Annotation, AnnotationBatch};

// =============================================================================
// GeoJSON Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<GeoGeometry>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct GeoGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    classification: Option<Classification>,
}

/// Classification appears either as a bare string or as an object with a
/// `name` field, depending on the producer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Classification {
    Name(String),
    Object { name: String },
}

impl Classification {
    fn into_name(self) -> String {
        match self {
            Classification::Name(name) | Classification::Object { name } => name,
        }
    }
}

// =============================================================================
// Result Importer
// =============================================================================

/// Parses a result artifact and merges it into the annotation tree.
pub struct ResultImporter;

impl ResultImporter {
    /// Read a result artifact into an [`AnnotationBatch`] without
    /// touching any annotation tree.
    ///
    /// # Errors
    ///
    /// [`ImportError::NotFound`] if the file is missing,
    /// [`ImportError::Parse`] for malformed JSON,
    /// [`ImportError::Geometry`] for geometry types other than
    /// `Polygon`/`MultiPolygon` or polygons without rings.
    pub fn read_batch(path: &Path) -> Result<AnnotationBatch, ImportError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ImportError::NotFound(path.to_path_buf())
            } else {
                ImportError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let collection: FeatureCollection = serde_json::from_str(&raw)?;

        let mut annotations = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            annotations.push(annotation_of(feature)?);
        }
        Ok(AnnotationBatch::new(annotations))
    }

    /// Import a result artifact as locked children of `target`.
    ///
    /// The whole file is parsed before any mutation, so a failure leaves
    /// `target` untouched. On success every imported annotation is
    /// locked, attached as a child of `target`, and `target` itself is
    /// locked afterwards. Returns the number of annotations attached.
    ///
    /// Calling this twice on the same artifact duplicates children; the
    /// orchestrator guarantees at most one import per run.
    pub fn import(target: &mut Annotation, path: &Path) -> Result<usize, ImportError> {
        let batch = Self::read_batch(path)?;
        let count = batch.len();

        for mut annotation in batch.into_annotations() {
            annotation.lock();
            target.children.push(annotation);
        }
        target.lock();

        info!("Imported {} polygon(s) from {}.", count, path.display());
        Ok(count)
    }
}

fn annotation_of(feature: Feature) -> Result<Annotation, ImportError> {
    let geometry = feature
        .geometry
        .ok_or_else(|| ImportError::Geometry("feature without geometry".to_string()))?;

    let polygons = match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Vec<[f64; 2]>> = serde_json::from_value(geometry.coordinates)?;
            vec![polygon_of(rings)?]
        }
        "MultiPolygon" => {
            let parts: Vec<Vec<Vec<[f64; 2]>>> = serde_json::from_value(geometry.coordinates)?;
            parts
                .into_iter()
                .map(polygon_of)
                .collect::<Result<Vec<_>, _>>()?
        }
        other => return Err(ImportError::Geometry(other.to_string())),
    };

    Ok(Annotation {
        name: feature.properties.name,
        classification: feature.properties.classification.map(Classification::into_name),
        polygons,
        locked: false,
        children: Vec::new(),
    })
}

fn polygon_of(mut rings: Vec<Vec<[f64; 2]>>) -> Result<Polygon, ImportError> {
    if rings.is_empty() {
        return Err(ImportError::Geometry("polygon with no rings".to_string()));
    }
    let exterior = rings.remove(0);
    Ok(Polygon {
        exterior,
        holes: rings,
    })
}

// =============================================================================
// Tests
// =============================================================================
