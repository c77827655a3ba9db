//! I/O modules for source containers, granule names and ingestion manifests

pub mod container;
pub mod granule;
pub mod ingest;

pub use container::{SourceContainer, SubdatasetRef};
pub use granule::GranuleName;
pub use ingest::{IngestEntry, IngestPlan, IngestPlanner};
