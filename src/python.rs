//! Python module definition

use crate::config::{ConvertParams, OutputNaming};
use crate::core::{locate, BatchConverter};
use crate::io::GranuleName;
use pyo3::prelude::*;
use std::path::Path;

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(locate_tile, m)?)?;
    m.add_function(wrap_pyfunction!(convert_directory, m)?)?;
    m.add_function(wrap_pyfunction!(parse_granule, m)?)?;
    Ok(())
}

/// Bounding box (west, south, east, north) of tile (h, v)
#[pyfunction]
fn locate_tile(h: i32, v: i32) -> (f64, f64, f64, f64) {
    let bbox = locate(h, v);
    (bbox.west, bbox.south, bbox.east, bbox.north)
}

/// Convert a directory; returns (processed, total, failed paths)
#[pyfunction]
#[pyo3(signature = (input_dir, output_dir, naming = "prefix"))]
fn convert_directory(
    input_dir: String,
    output_dir: String,
    naming: &str,
) -> PyResult<(usize, usize, Vec<String>)> {
    let naming = match naming.to_lowercase().as_str() {
        "prefix" => OutputNaming::Prefix,
        "stem" => OutputNaming::Stem,
        _ => {
            return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                "Invalid naming: {}",
                naming
            )))
        }
    };

    let params = ConvertParams { naming, ..Default::default() };
    let converter = BatchConverter::new(params)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;

    let summary = converter
        .run(Path::new(&input_dir), Path::new(&output_dir), |p| {
            log::info!("{:.1}% Complete", p.percent());
        })
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)))?;

    let failed = summary
        .failures
        .iter()
        .map(|f| f.path.display().to_string())
        .collect();
    Ok((summary.processed, summary.total, failed))
}

/// Parse a granule file name into (product, acquisition date, h, v, time_start)
#[pyfunction]
fn parse_granule(name: &str) -> PyResult<(String, String, i32, i32, String)> {
    let granule = GranuleName::parse(name)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;
    Ok((
        granule.product.clone(),
        granule.acquisition_date.to_string(),
        granule.tile.h,
        granule.tile.v,
        granule.time_start().format("%Y-%m-%dT%H:%M:%S").to_string(),
    ))
}
