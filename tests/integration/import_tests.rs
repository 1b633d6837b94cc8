//! Result import round-trip tests.

use std::sync::Arc;

use tseg_runner::{Annotation, RegionBounds, ResultImporter, Selection};

use super::test_utils::sample_geojson;

#[test]
fn test_import_into_selection_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("polygons.geojson");
    std::fs::write(&artifact, sample_geojson(4)).unwrap();

    let selection = Selection::from_bounds(RegionBounds::new(0, 0, 1000, 1000));

    let count = {
        let mut annotation = selection.annotation.lock().unwrap();
        ResultImporter::import(&mut annotation, &artifact).unwrap()
    };

    assert_eq!(count, 4);
    let annotation = selection.annotation.lock().unwrap();
    assert!(annotation.locked);
    assert_eq!(annotation.child_count(), 4);
    assert!(annotation.children.iter().all(|child| child.locked));
    assert!(annotation
        .children
        .iter()
        .all(|child| child.classification.as_deref() == Some("Tumor")));
}

#[test]
fn test_written_tree_parses_back() {
    // The file-backed host writes the merged tree with
    // to_geojson_features; the importer must accept that output again.
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("polygons.geojson");
    std::fs::write(&artifact, sample_geojson(2)).unwrap();

    let mut parent = Annotation::from_region(RegionBounds::new(0, 0, 100, 100));
    ResultImporter::import(&mut parent, &artifact).unwrap();

    let rewritten = dir.path().join("rewritten.geojson");
    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": parent.to_geojson_features(),
    });
    std::fs::write(&rewritten, collection.to_string()).unwrap();

    let batch = ResultImporter::read_batch(&rewritten).unwrap();
    // Parent rectangle plus the two imported polygons.
    assert_eq!(batch.len(), 3);
}

#[test]
fn test_shared_annotation_is_visible_across_clones() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("polygons.geojson");
    std::fs::write(&artifact, sample_geojson(1)).unwrap();

    let selection = Selection::from_bounds(RegionBounds::new(0, 0, 10, 10));
    let observer = Arc::clone(&selection.annotation);

    {
        let mut annotation = selection.annotation.lock().unwrap();
        ResultImporter::import(&mut annotation, &artifact).unwrap();
    }

    // The host's handle observes the imported, locked children.
    let seen = observer.lock().unwrap();
    assert_eq!(seen.child_count(), 1);
    assert!(seen.locked);
}
