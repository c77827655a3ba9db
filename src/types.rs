use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Position of a tile in the 10°×10° global equirectangular grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    pub h: i32, // 0..35, west to east
    pub v: i32, // 0..17, north to south
}

impl TileIndex {
    pub fn new(h: i32, v: i32) -> Self {
        Self { h, v }
    }
}

impl std::fmt::Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{:02}v{:02}", self.h, self.v)
    }
}

/// Geographic bounding box in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Affine transform mapping a `width` x `height` pixel grid onto this box,
    /// north-up with the origin at the upper-left corner.
    pub fn geo_transform(&self, width: usize, height: usize) -> GeoTransform {
        GeoTransform {
            top_left_x: self.west,
            pixel_width: (self.east - self.west) / width as f64,
            rotation_x: 0.0,
            top_left_y: self.north,
            rotation_y: 0.0,
            pixel_height: -(self.north - self.south) / height as f64,
        }
    }

    /// Extent covered by a north-up raster of the given size
    pub fn from_geo_transform(transform: &GeoTransform, width: usize, height: usize) -> Self {
        let east = transform.top_left_x + transform.pixel_width * width as f64;
        let south = transform.top_left_y + transform.pixel_height * height as f64;
        Self {
            west: transform.top_left_x,
            south,
            east,
            north: transform.top_left_y,
        }
    }
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Coefficients in GDAL order
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Coefficient-wise comparison with an absolute tolerance
    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// Stage of the per-file pipeline, used to attribute failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Output,
    Open,
    Extract,
    Merge,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Output => write!(f, "output"),
            Stage::Open => write!(f, "open"),
            Stage::Extract => write!(f, "extract"),
            Stage::Merge => write!(f, "merge"),
        }
    }
}

/// Error types for tile conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Invalid container format: {0}")]
    Format(String),

    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("No subdatasets found in {0}")]
    NoSubdatasets(PathBuf),

    #[error("Merge error: {0}")]
    Merge(String),

    #[error("Output already exists or is claimed by another input: {0}")]
    NamingCollision(PathBuf),

    #[error("Granule name error: {0}")]
    Granule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{stage} failed for {path}: {source}")]
    File {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: Box<ConvertError>,
    },
}

impl ConvertError {
    /// Attach the file and pipeline stage to an error
    pub fn in_file(self, path: impl Into<PathBuf>, stage: Stage) -> Self {
        ConvertError::File {
            path: path.into(),
            stage,
            source: Box::new(self),
        }
    }
}

/// Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;
