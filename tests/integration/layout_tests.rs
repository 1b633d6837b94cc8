//! Layout resolution and scratch eviction tests.

use tseg_runner::{clear_scratch, InferenceLayout, Settings};

use super::test_utils::{install_model, ready_layout};

#[test]
fn test_resolve_from_settings_uses_base_dir() {
    let base = tempfile::tempdir().unwrap();

    let mut settings = Settings::default();
    settings.base_dir = Some(base.path().to_path_buf());
    settings.root_dir = "inference-root".to_string();
    settings.repo_dir = "runtime".to_string();

    let layout = InferenceLayout::resolve_from(&settings).unwrap();

    assert_eq!(layout.root(), base.path().join("inference-root"));
    assert_eq!(layout.repo_dir(), layout.root().join("runtime"));
    assert!(layout.models_dir().is_dir());
    assert!(layout.tile_scratch().is_dir());
    assert!(layout.output_scratch().is_dir());
}

#[test]
fn test_layout_survives_repeated_resolution_with_contents() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    // Resolving again must not disturb existing contents.
    let again = InferenceLayout::resolve(base.path(), ".tseg", "tseg-inference").unwrap();
    assert_eq!(layout, again);
    assert!(model.is_file());
    assert!(again.has_completed_setup());
    assert!(again.script_path().is_file());
}

#[tokio::test]
async fn test_clear_scratch_preserves_models_and_marker() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    std::fs::write(layout.tile_scratch().join("tile_0.jpg"), b"x").unwrap();
    std::fs::write(layout.output_scratch().join("polygons.geojson"), b"{}").unwrap();

    clear_scratch(&layout).await;

    // Scratch is empty, everything else untouched.
    assert_eq!(std::fs::read_dir(layout.tile_scratch()).unwrap().count(), 0);
    assert_eq!(
        std::fs::read_dir(layout.output_scratch()).unwrap().count(),
        0
    );
    assert!(model.is_file());
    assert!(layout.has_completed_setup());
    assert!(layout.script_path().is_file());
}

#[test]
fn test_fresh_layout_is_not_set_up() {
    let base = tempfile::tempdir().unwrap();
    let layout = InferenceLayout::resolve(base.path(), ".tseg", "tseg-inference").unwrap();

    assert!(!layout.has_completed_setup());
    assert!(layout.list_models().unwrap().is_empty());
}
