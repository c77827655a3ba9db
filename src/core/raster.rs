//! GeoTIFF writing shared by the extractor and the merger

use crate::types::{ConvertError, ConvertResult, GeoTransform};
use gdal::raster::{GdalDataType, GdalType, RasterCreationOption};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use std::path::Path;

/// EPSG code of WGS84 geographic coordinates
pub const WGS84_EPSG: u32 = 4326;

/// Pixel sample types carried through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl SampleType {
    pub fn from_gdal(data_type: GdalDataType) -> ConvertResult<Self> {
        match data_type {
            GdalDataType::UInt8 => Ok(SampleType::UInt8),
            GdalDataType::Int16 => Ok(SampleType::Int16),
            GdalDataType::UInt16 => Ok(SampleType::UInt16),
            GdalDataType::Int32 => Ok(SampleType::Int32),
            GdalDataType::UInt32 => Ok(SampleType::UInt32),
            GdalDataType::Float32 => Ok(SampleType::Float32),
            GdalDataType::Float64 => Ok(SampleType::Float64),
            other => Err(ConvertError::Format(format!("unsupported sample type {:?}", other))),
        }
    }

    pub fn to_gdal(self) -> GdalDataType {
        match self {
            SampleType::UInt8 => GdalDataType::UInt8,
            SampleType::Int16 => GdalDataType::Int16,
            SampleType::UInt16 => GdalDataType::UInt16,
            SampleType::Int32 => GdalDataType::Int32,
            SampleType::UInt32 => GdalDataType::UInt32,
            SampleType::Float32 => GdalDataType::Float32,
            SampleType::Float64 => GdalDataType::Float64,
        }
    }

    /// Smallest type able to hold samples of both `self` and `other` exactly,
    /// as GDAL computes it. A 64-bit integer union (UInt32 with Int32) is
    /// written as Float64 instead.
    pub fn union(self, other: SampleType) -> SampleType {
        SampleType::from_gdal(self.to_gdal().union(other.to_gdal())).unwrap_or(SampleType::Float64)
    }
}

/// One band to be copied into an output raster
pub struct BandSource<'a> {
    pub dataset: &'a Dataset,
    /// 1-based band number inside `dataset`
    pub band: isize,
    pub description: Option<String>,
}

/// Georeferencing and layout of a GeoTIFF to be written
pub struct RasterLayout<'a> {
    pub size: (usize, usize),
    pub geo_transform: GeoTransform,
    pub spatial_ref: &'a SpatialRef,
    pub creation_options: &'a [(String, String)],
}

/// Sample type of a band
pub fn band_sample_type(dataset: &Dataset, band: isize) -> ConvertResult<SampleType> {
    let rasterband = dataset.rasterband(band)?;
    SampleType::from_gdal(rasterband.band_type())
}

/// Write `bands` in order into a new GeoTIFF at `output_path`.
///
/// Pixel values are read in `sample_type`, so sources of a narrower type are
/// widened rather than truncated.
pub fn write_geotiff(
    output_path: &Path,
    sample_type: SampleType,
    layout: &RasterLayout,
    bands: &[BandSource],
) -> ConvertResult<()> {
    match sample_type {
        SampleType::UInt8 => write_geotiff_as::<u8>(output_path, layout, bands),
        SampleType::Int16 => write_geotiff_as::<i16>(output_path, layout, bands),
        SampleType::UInt16 => write_geotiff_as::<u16>(output_path, layout, bands),
        SampleType::Int32 => write_geotiff_as::<i32>(output_path, layout, bands),
        SampleType::UInt32 => write_geotiff_as::<u32>(output_path, layout, bands),
        SampleType::Float32 => write_geotiff_as::<f32>(output_path, layout, bands),
        SampleType::Float64 => write_geotiff_as::<f64>(output_path, layout, bands),
    }
}

fn write_geotiff_as<T: GdalType + Copy>(
    output_path: &Path,
    layout: &RasterLayout,
    bands: &[BandSource],
) -> ConvertResult<()> {
    if bands.is_empty() {
        return Err(ConvertError::Merge(format!(
            "no bands to write to {}",
            output_path.display()
        )));
    }

    let (width, height) = layout.size;
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let options: Vec<RasterCreationOption> = layout
        .creation_options
        .iter()
        .map(|(key, value)| RasterCreationOption { key: key.as_str(), value: value.as_str() })
        .collect();

    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        output_path,
        width as isize,
        height as isize,
        bands.len() as isize,
        &options,
    )?;

    dataset.set_geo_transform(&layout.geo_transform.to_gdal())?;
    dataset.set_spatial_ref(layout.spatial_ref)?;

    for (i, source) in bands.iter().enumerate() {
        let input = source.dataset.rasterband(source.band)?;
        let buffer = input.read_as::<T>((0, 0), (width, height), (width, height), None)?;

        let mut output = dataset.rasterband(i as isize + 1)?;
        output.write((0, 0), (width, height), &buffer)?;

        if let Some(no_data) = input.no_data_value() {
            output.set_no_data_value(Some(no_data))?;
        }
        if let Some(description) = &source.description {
            output.set_description(description)?;
        }
    }

    log::debug!(
        "Wrote {} band(s) of {}x{} to {}",
        bands.len(),
        width,
        height,
        output_path.display()
    );
    Ok(())
}

/// WGS84 spatial reference
pub fn wgs84() -> ConvertResult<SpatialRef> {
    Ok(SpatialRef::from_epsg(WGS84_EPSG)?)
}
