//! Fixture builders: GeoTIFF "subdatasets" wrapped in a VRT container that
//! lists them in its SUBDATASETS metadata domain, the way GDAL exposes the
//! layers of an HDF5 Black Marble granule.

#![allow(dead_code)]

use gdal::raster::{Buffer, GdalType};
use gdal::{DriverManager, Metadata};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const NTL: &str = "Gap_Filled_DNB_BRDF-Corrected_NTL";
pub const QF: &str = "Mandatory_Quality_Flag";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Pixel content of one fixture subdataset
pub enum Pixels {
    U16(Vec<u16>),
    U8(Vec<u8>),
}

pub struct Part {
    pub name: String,
    pub size: (usize, usize),
    pub pixels: Pixels,
    pub tile: Option<(i32, i32)>,
}

impl Part {
    pub fn u16(name: &str, size: (usize, usize), tile: Option<(i32, i32)>) -> Self {
        let values = (0..size.0 * size.1).map(|i| (i * 100 + 7) as u16).collect();
        Self { name: name.to_string(), size, pixels: Pixels::U16(values), tile }
    }

    pub fn u8(name: &str, size: (usize, usize), tile: Option<(i32, i32)>) -> Self {
        let values = (0..size.0 * size.1).map(|i| (i % 4) as u8).collect();
        Self { name: name.to_string(), size, pixels: Pixels::U8(values), tile }
    }

    /// Pixel values widened to f64, row-major
    pub fn values_f64(&self) -> Vec<f64> {
        match &self.pixels {
            Pixels::U16(v) => v.iter().map(|&x| x as f64).collect(),
            Pixels::U8(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// Scratch area with an input directory, an output directory, a temp root
/// and a private directory for subdataset files
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create temp dir");
        for dir in ["input", "output", "parts"] {
            std::fs::create_dir_all(root.path().join(dir)).expect("create fixture dir");
        }
        Self { root }
    }

    pub fn input(&self) -> PathBuf {
        self.root.path().join("input")
    }

    pub fn output(&self) -> PathBuf {
        self.root.path().join("output")
    }

    pub fn temp(&self) -> PathBuf {
        self.root.path().join("tmp")
    }

    /// Write a container named `file_name` into the input directory
    pub fn add_container(&self, file_name: &str, parts: &[Part]) -> PathBuf {
        self.add_container_with_metadata(file_name, parts, None)
    }

    /// Container whose own default-domain metadata carries tile indices
    pub fn add_container_with_metadata(
        &self,
        file_name: &str,
        parts: &[Part],
        container_tile: Option<(i32, i32)>,
    ) -> PathBuf {
        let part_dir = self.root.path().join("parts").join(file_name);
        std::fs::create_dir_all(&part_dir).expect("create part dir");

        let mut items = String::new();
        for (i, part) in parts.iter().enumerate() {
            let path = part_dir.join(format!("{}.tif", part.name));
            write_part(&path, part);
            items.push_str(&format!(
                "    <MDI key=\"SUBDATASET_{n}_NAME\">{path}</MDI>\n    <MDI key=\"SUBDATASET_{n}_DESC\">[{w}x{h}] {name}</MDI>\n",
                n = i + 1,
                path = path.display(),
                w = part.size.0,
                h = part.size.1,
                name = part.name
            ));
        }

        let default_metadata = match container_tile {
            Some((h, v)) => format!(
                "  <Metadata>\n    <MDI key=\"HorizontalTileNumber\">{}</MDI>\n    <MDI key=\"VerticalTileNumber\">{}</MDI>\n  </Metadata>\n",
                h, v
            ),
            None => String::new(),
        };

        let subdatasets = if items.is_empty() {
            String::new()
        } else {
            format!("  <Metadata domain=\"SUBDATASETS\">\n{}  </Metadata>\n", items)
        };

        let vrt = format!(
            "<VRTDataset rasterXSize=\"1\" rasterYSize=\"1\">\n{}{}  <VRTRasterBand dataType=\"Byte\" band=\"1\"/>\n</VRTDataset>\n",
            default_metadata, subdatasets
        );

        let container = self.input().join(file_name);
        std::fs::write(&container, vrt).expect("write container");
        container
    }
}

fn write_part(path: &Path, part: &Part) {
    match &part.pixels {
        Pixels::U16(values) => write_tiff::<u16>(path, part, values.clone()),
        Pixels::U8(values) => write_tiff::<u8>(path, part, values.clone()),
    }
}

fn write_tiff<T: GdalType + Copy>(path: &Path, part: &Part, values: Vec<T>) {
    let (width, height) = part.size;
    let driver = DriverManager::get_driver_by_name("GTiff").expect("GTiff driver");
    let mut dataset = driver
        .create_with_band_type::<T, _>(path, width as isize, height as isize, 1)
        .expect("create part");

    if let Some((h, v)) = part.tile {
        dataset
            .set_metadata_item("HorizontalTileNumber", &h.to_string(), "")
            .expect("set H");
        dataset
            .set_metadata_item("VerticalTileNumber", &v.to_string(), "")
            .expect("set V");
    }

    let mut band = dataset.rasterband(1).expect("band 1");
    band.write((0, 0), (width, height), &Buffer::new((width, height), values))
        .expect("write pixels");
}
