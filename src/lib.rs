//! nightglow: Batch georeferencing and band stacking for Black Marble night-light tiles
//!
//! Black Marble (VNP46) products arrive as HDF containers holding one
//! subdataset per layer and no usable georeferencing. This library places each
//! tile on the 10°×10° global grid from its tile indices, writes every
//! subdataset as a WGS84 GeoTIFF band, and stacks them into one raster per
//! source file.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{BoundingBox, ConvertError, ConvertResult, GeoTransform, Stage, TileIndex};
pub use config::{ConvertParams, FailurePolicy, OutputNaming, OverwritePolicy};
pub use crate::core::{locate, BandMerger, BatchConverter, BatchSummary, Progress, SubdatasetExtractor};
pub use io::{GranuleName, IngestPlanner, SourceContainer};
