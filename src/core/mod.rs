//! Conversion pipeline: locate tile, extract subdatasets, stack bands, batch

pub mod tile_locator;
pub mod raster;
pub mod extract;
pub mod merge;
pub mod batch;

// Re-export main types
pub use tile_locator::locate;
pub use extract::{SubdatasetExtractor, TempRaster};
pub use merge::BandMerger;
pub use batch::{BatchConverter, BatchSummary, FileFailure, Progress};
