//! Tile export collaborator boundary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ExportError;

use super::spec::TileExportSpec;

/// External collaborator that writes image tiles to disk.
///
/// The pipeline only defines the contract this is called with: the export
/// must be complete when the future resolves, because the exchange with
/// the inference process is filesystem-based, not streamed. Image
/// decoding and encoding are entirely the implementor's concern.
#[async_trait]
pub trait TileExporter: Send + Sync {
    /// Export the spec's region as tiles into `dest`.
    ///
    /// Returns the number of tiles written.
    async fn export(&self, spec: &TileExportSpec, dest: &Path) -> Result<usize, ExportError>;
}

/// Tile exporter that stages pre-rendered tiles from a source directory.
///
/// Used by the CLI, where tiles are produced ahead of time by the host
/// image server. Files matching the spec's image extension are copied
/// into the tile scratch directory.
pub struct DirectoryTileExporter {
    source: PathBuf,
}

impl DirectoryTileExporter {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl TileExporter for DirectoryTileExporter {
    async fn export(&self, spec: &TileExportSpec, dest: &Path) -> Result<usize, ExportError> {
        if !self.source.is_dir() {
            return Err(ExportError::SourceNotFound(self.source.clone()));
        }

        let extension = spec.image_extension();
        let mut staged = 0usize;

        let mut entries = tokio::fs::read_dir(&self.source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            let matches = name
                .to_str()
                .is_some_and(|n| n.ends_with(extension));
            if !path.is_file() || !matches {
                debug!("Skipping non-tile entry {}", path.display());
                continue;
            }

            tokio::fs::copy(&path, dest.join(&name)).await?;
            staged += 1;
        }

        if staged == 0 {
            return Err(ExportError::NoTiles {
                dir: self.source.clone(),
                extension: extension.to_string(),
            });
        }

        info!(
            "Staged {} tile(s) from {} into {}",
            staged,
            self.source.display(),
            dest.display()
        );
        Ok(staged)
    }
}

// =============================================================================
// Tests
// =============================================================================
