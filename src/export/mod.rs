//! Region-to-tile export.
//!
//! This module turns a selected region plus calibration parameters into a
//! concrete tile geometry ([`TileExportSpec`]) and defines the contract the
//! external tile-export collaborator is called with ([`TileExporter`]).
//! No image decoding or encoding happens here.

mod exporter;
mod spec;

pub use exporter::{DirectoryTileExporter, TileExporter};
pub use spec::{TileExportSpec, INCLUDE_PARTIAL_TILES};
