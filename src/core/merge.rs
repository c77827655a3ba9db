//! Band stacking of temporary rasters into one multi-band GeoTIFF

use crate::core::extract::TempRaster;
use crate::core::raster::{band_sample_type, wgs84, write_geotiff, BandSource, RasterLayout, SampleType};
use crate::types::{ConvertError, ConvertResult, GeoTransform};
use gdal::Dataset;
use std::path::{Path, PathBuf};

/// Tolerance when comparing geotransform coefficients of the inputs
const GEO_TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Stacks single-subdataset rasters into one output raster
pub struct BandMerger {
    creation_options: Vec<(String, String)>,
}

impl BandMerger {
    pub fn new() -> Self {
        Self { creation_options: Vec::new() }
    }

    pub fn with_creation_options(creation_options: Vec<(String, String)>) -> Self {
        Self { creation_options }
    }

    /// Stack every band of `inputs`, in order, into `output_path`.
    ///
    /// The raster is written to a hidden sibling file and renamed onto
    /// `output_path` only once complete, so an existing file there is replaced
    /// on success and left untouched on failure. The inputs are consumed and
    /// deleted either way.
    pub fn merge(&self, inputs: Vec<TempRaster>, output_path: &Path) -> ConvertResult<PathBuf> {
        log::info!(
            "Merging {} temporary raster(s) into {}",
            inputs.len(),
            output_path.display()
        );

        self.stage_and_persist(&inputs, output_path).map_err(|e| match e {
            ConvertError::Merge(_) => e,
            other => ConvertError::Merge(format!(
                "writing {} failed: {}",
                output_path.display(),
                other
            )),
        })?;

        Ok(output_path.to_path_buf())
        // `inputs` drops here, deleting the temporaries on both paths
    }

    fn stage_and_persist(&self, inputs: &[TempRaster], output_path: &Path) -> ConvertResult<()> {
        let output_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        // Deleted on drop unless persisted
        let staging = tempfile::Builder::new()
            .prefix(".nightglow-")
            .suffix(".tif")
            .tempfile_in(output_dir)?
            .into_temp_path();
        // Reserved name only; GDAL creates the file with default permissions
        std::fs::remove_file(&staging)?;

        self.stack(inputs, &staging, output_path)?;
        staging.persist(output_path).map_err(std::io::Error::from)?;
        Ok(())
    }

    fn stack(&self, inputs: &[TempRaster], staging_path: &Path, output_path: &Path) -> ConvertResult<()> {
        if inputs.is_empty() {
            return Err(ConvertError::Merge(format!(
                "no rasters to merge into {}",
                output_path.display()
            )));
        }

        let datasets = inputs
            .iter()
            .map(|raster| Dataset::open(raster.path()))
            .collect::<Result<Vec<_>, _>>()?;

        let size = datasets[0].raster_size();
        let geo_transform = GeoTransform::from_gdal(datasets[0].geo_transform()?);
        let mut sample_type: Option<SampleType> = None;

        for (raster, dataset) in inputs.iter().zip(&datasets) {
            if dataset.raster_size() != size {
                return Err(ConvertError::Merge(format!(
                    "{} is {:?} pixels but {} is {:?}",
                    raster.path().display(),
                    dataset.raster_size(),
                    inputs[0].path().display(),
                    size
                )));
            }

            let other = GeoTransform::from_gdal(dataset.geo_transform()?);
            if !other.approx_eq(&geo_transform, GEO_TRANSFORM_TOLERANCE) {
                return Err(ConvertError::Merge(format!(
                    "{} has geotransform {:?}, expected {:?}",
                    raster.path().display(),
                    other.to_gdal(),
                    geo_transform.to_gdal()
                )));
            }

            for band in 1..=dataset.raster_count() {
                let band_type = band_sample_type(dataset, band)?;
                sample_type = Some(match sample_type {
                    Some(current) => current.union(band_type),
                    None => band_type,
                });
            }
        }

        let sample_type = sample_type.ok_or_else(|| {
            ConvertError::Merge(format!("inputs for {} contain no bands", output_path.display()))
        })?;

        let srs = match datasets[0].spatial_ref() {
            Ok(srs) => srs,
            Err(_) => wgs84()?,
        };

        let bands: Vec<BandSource> = inputs
            .iter()
            .zip(&datasets)
            .flat_map(|(raster, dataset)| {
                (1..=dataset.raster_count()).map(move |band| BandSource {
                    dataset,
                    band,
                    description: Some(raster.band_name.clone()),
                })
            })
            .collect();

        let layout = RasterLayout {
            size,
            geo_transform,
            spatial_ref: &srs,
            creation_options: &self.creation_options,
        };

        log::debug!(
            "Stacking {} band(s) as {:?} into {}",
            bands.len(),
            sample_type,
            output_path.display()
        );
        write_geotiff(staging_path, sample_type, &layout, &bands)
    }
}

impl Default for BandMerger {
    fn default() -> Self {
        Self::new()
    }
}
