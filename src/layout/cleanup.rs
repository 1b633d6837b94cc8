//! Best-effort scratch-space eviction.
//!
//! Cleanup failures never fail a run: every error in here is logged at
//! `warn` and swallowed. The scratch directories themselves are left in
//! place; only their contents are removed.

use std::path::Path;

use tracing::{debug, warn};

use super::InferenceLayout;

/// Remove the contents of `dir`, leaving the directory itself in place.
///
/// Missing or non-directory paths are ignored. Individual deletion
/// failures are logged and do not stop the sweep.
pub async fn clear_dir(dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to list {} for cleanup: {}", dir.display(), err);
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!("Failed to read entry in {}: {}", dir.display(), err);
                break;
            }
        };

        let path = entry.path();
        let removed = if path.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        if let Err(err) = removed {
            warn!("Failed to delete {}: {}", path.display(), err);
        }
    }

    debug!("Cleared {}", dir.display());
}

/// Evict both scratch directories of the layout.
pub async fn clear_scratch(layout: &InferenceLayout) {
    clear_dir(layout.tile_scratch()).await;
    clear_dir(layout.output_scratch()).await;
}

// =============================================================================
// Tests
// =============================================================================
