//! Tile-grid georeferencing for the Black Marble 10°×10° grid

use crate::types::{BoundingBox, TileIndex};

/// Edge length of one grid cell in degrees
pub const TILE_SIZE_DEG: f64 = 10.0;

/// Number of tile columns (H) in the global grid
pub const GRID_COLUMNS: i32 = 36;

/// Number of tile rows (V) in the global grid
pub const GRID_ROWS: i32 = 18;

/// Bounding box of tile (h, v).
///
/// Tile h00v00 has its north-west corner at (-180°, 90°). Indices outside the
/// grid are not rejected; they simply yield boxes outside the globe.
pub fn locate(h: i32, v: i32) -> BoundingBox {
    let west = TILE_SIZE_DEG * h as f64 - 180.0;
    let north = 90.0 - TILE_SIZE_DEG * v as f64;
    BoundingBox {
        west,
        south: north - TILE_SIZE_DEG,
        east: west + TILE_SIZE_DEG,
        north,
    }
}

impl TileIndex {
    pub fn bounds(&self) -> BoundingBox {
        locate(self.h, self.v)
    }

    /// Whether the index lies inside the 36 x 18 grid
    pub fn is_on_grid(&self) -> bool {
        (0..GRID_COLUMNS).contains(&self.h) && (0..GRID_ROWS).contains(&self.v)
    }
}
