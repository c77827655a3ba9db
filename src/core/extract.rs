//! Subdataset extraction: one container subdataset to one georeferenced GeoTIFF

use crate::core::raster::{band_sample_type, wgs84, write_geotiff, BandSource, RasterLayout};
use crate::core::tile_locator::locate;
use crate::io::container::{SourceContainer, SubdatasetRef};
use crate::io::granule::GranuleName;
use crate::types::{BoundingBox, ConvertError, ConvertResult, TileIndex};
use gdal::{Dataset, Metadata};
use std::path::{Path, PathBuf};

/// Metadata key of the horizontal tile index
pub const HORIZONTAL_TILE_KEY: &str = "HorizontalTileNumber";

/// Metadata key of the vertical tile index
pub const VERTICAL_TILE_KEY: &str = "VerticalTileNumber";

/// Intermediate single-subdataset GeoTIFF, deleted when dropped
#[derive(Debug)]
pub struct TempRaster {
    path: PathBuf,
    /// Band description for the merged output
    pub band_name: String,
    pub tile: TileIndex,
    pub bbox: BoundingBox,
}

impl TempRaster {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRaster {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::warn!("Failed to remove temporary raster {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Extracts container subdatasets into georeferenced temporary rasters
pub struct SubdatasetExtractor {
    creation_options: Vec<(String, String)>,
}

impl SubdatasetExtractor {
    pub fn new() -> Self {
        Self { creation_options: Vec::new() }
    }

    /// GDAL creation options applied to the temporary GeoTIFFs
    pub fn with_creation_options(creation_options: Vec<(String, String)>) -> Self {
        Self { creation_options }
    }

    /// Write `subdataset` of `container` to a GeoTIFF inside `temp_dir`,
    /// georeferenced from its tile indices in EPSG:4326.
    pub fn extract(
        &self,
        container: &SourceContainer,
        subdataset: &SubdatasetRef,
        temp_dir: &Path,
    ) -> ConvertResult<TempRaster> {
        let dataset = container.open_subdataset(subdataset)?;

        let tile = read_tile_index(container, subdataset, &dataset)?;
        check_against_file_name(container, tile);
        let bbox = locate(tile.h, tile.v);

        let band_count = dataset.raster_count();
        if band_count < 1 {
            return Err(ConvertError::Format(format!(
                "subdataset {} of {} has no raster bands",
                subdataset.ordinal,
                container.path().display()
            )));
        }

        let size = dataset.raster_size();
        let geo_transform = bbox.geo_transform(size.0, size.1);
        log::debug!(
            "Subdataset {} ({}): tile {} -> {:?}, {}x{} px",
            subdataset.ordinal,
            subdataset.leaf_name(),
            tile,
            bbox,
            size.0,
            size.1
        );

        let mut sample_type = band_sample_type(&dataset, 1)?;
        for band in 2..=band_count {
            sample_type = sample_type.union(band_sample_type(&dataset, band)?);
        }

        let file_name = format!(
            "{}_{:02}_{}_BBOX.tif",
            container.stem(),
            subdataset.ordinal,
            subdataset.file_safe_name()
        );
        let band_name = subdataset.leaf_name();

        // Owns the path before writing so a failed write leaves nothing behind
        let raster = TempRaster {
            path: temp_dir.join(file_name),
            band_name: band_name.clone(),
            tile,
            bbox,
        };

        let srs = wgs84()?;
        let layout = RasterLayout {
            size,
            geo_transform,
            spatial_ref: &srs,
            creation_options: &self.creation_options,
        };
        let bands: Vec<BandSource> = (1..=band_count)
            .map(|band| BandSource {
                dataset: &dataset,
                band,
                description: Some(band_name.clone()),
            })
            .collect();

        write_geotiff(raster.path(), sample_type, &layout, &bands)?;
        Ok(raster)
    }
}

impl Default for SubdatasetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Tile indices of a subdataset, falling back to container-level metadata
fn read_tile_index(
    container: &SourceContainer,
    subdataset: &SubdatasetRef,
    dataset: &Dataset,
) -> ConvertResult<TileIndex> {
    let h = read_index(container, subdataset, dataset, HORIZONTAL_TILE_KEY)?;
    let v = read_index(container, subdataset, dataset, VERTICAL_TILE_KEY)?;
    Ok(TileIndex::new(h, v))
}

fn read_index(
    container: &SourceContainer,
    subdataset: &SubdatasetRef,
    dataset: &Dataset,
    key: &str,
) -> ConvertResult<i32> {
    let raw = dataset
        .metadata_item(key, "")
        .or_else(|| container.metadata_item(key))
        .ok_or_else(|| {
            ConvertError::MissingMetadata(format!(
                "{} not found for subdataset {} of {}",
                key,
                subdataset.ordinal,
                container.path().display()
            ))
        })?;

    raw.trim().parse::<i32>().map_err(|_| {
        ConvertError::MissingMetadata(format!(
            "{} of subdataset {} in {} is not an integer: '{}'",
            key,
            subdataset.ordinal,
            container.path().display(),
            raw
        ))
    })
}

/// Metadata is authoritative; a disagreeing granule name is only reported
fn check_against_file_name(container: &SourceContainer, tile: TileIndex) {
    let Some(file_name) = container.path().file_name() else {
        return;
    };
    if let Ok(granule) = GranuleName::parse(&file_name.to_string_lossy()) {
        if granule.tile != tile {
            log::warn!(
                "{}: file name says tile {} but metadata says {}; using metadata",
                container.path().display(),
                granule.tile,
                tile
            );
        }
    }
}
