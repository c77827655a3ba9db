//! Conversion parameters, loadable from TOML

use crate::types::{ConvertError, ConvertResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How the output file name is derived from the source file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputNaming {
    /// Everything before the first `.`: `A2020015.h10v05.hdf` -> `A2020015.tif`
    Prefix,
    /// File name minus its last extension; keeps full granule names
    Stem,
}

impl OutputNaming {
    /// Output file name (with `.tif`) for a source file name
    pub fn output_name(&self, source_file_name: &str) -> String {
        let base = match self {
            OutputNaming::Prefix => source_file_name.split('.').next().unwrap_or(source_file_name),
            OutputNaming::Stem => match source_file_name.rfind('.') {
                Some(pos) if pos > 0 => &source_file_name[..pos],
                _ => source_file_name,
            },
        };
        format!("{}.tif", base)
    }
}

/// What to do when an output file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Refuse with a naming-collision error
    Fail,
    /// Replace the file and log a warning
    Overwrite,
}

/// What the batch does after a file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and go on with the next file
    Continue,
    /// Stop the batch at the first failure
    Abort,
}

/// Batch conversion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertParams {
    /// Root of the per-file temporary directories, created when absent
    pub temp_dir: PathBuf,
    pub naming: OutputNaming,
    pub overwrite: OverwritePolicy,
    pub failure_policy: FailurePolicy,
    /// Process input files in file name order instead of directory order
    pub sort_inputs: bool,
    /// GDAL GeoTIFF creation options, e.g. `COMPRESS = "DEFLATE"`
    pub creation_options: BTreeMap<String, String>,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("nightglow"),
            naming: OutputNaming::Prefix,
            overwrite: OverwritePolicy::Fail,
            failure_policy: FailurePolicy::Continue,
            sort_inputs: true,
            creation_options: BTreeMap::new(),
        }
    }
}

impl ConvertParams {
    /// Load parameters from a TOML file; absent keys keep their defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let params = Self::from_toml_str(&text)
            .map_err(|e| ConvertError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        log::debug!("Loaded conversion parameters from {}", path.as_ref().display());
        Ok(params)
    }

    pub fn from_toml_str(text: &str) -> ConvertResult<Self> {
        let params: ConvertParams =
            toml::from_str(text).map_err(|e| ConvertError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> ConvertResult<()> {
        if self.temp_dir.as_os_str().is_empty() {
            return Err(ConvertError::Config("temp_dir must not be empty".to_string()));
        }
        if let Some(key) = self.creation_options.keys().find(|k| k.trim().is_empty()) {
            return Err(ConvertError::Config(format!("invalid creation option key '{}'", key)));
        }
        Ok(())
    }

    /// Add a `KEY=VALUE` creation option as given on a command line
    pub fn push_creation_option(&mut self, option: &str) -> ConvertResult<()> {
        let (key, value) = option
            .split_once('=')
            .ok_or_else(|| ConvertError::Config(format!("expected KEY=VALUE, got '{}'", option)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConvertError::Config(format!("expected KEY=VALUE, got '{}'", option)));
        }
        self.creation_options.insert(key.to_uppercase(), value.trim().to_string());
        Ok(())
    }

    /// Creation options in key order
    pub fn creation_option_pairs(&self) -> Vec<(String, String)> {
        self.creation_options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
