use crate::types::{ConvertError, ConvertResult};
use gdal::{Dataset, Metadata};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata domain in which GDAL lists the subdatasets of a container
const SUBDATASETS_DOMAIN: &str = "SUBDATASETS";

/// One subdataset entry of a container
#[derive(Debug, Clone, PartialEq)]
pub struct SubdatasetRef {
    /// 1-based position in the container
    pub ordinal: usize,
    /// GDAL connection string, e.g. `HDF5:"file.h5"://HDFEOS/GRIDS/.../Band`
    pub name: String,
    pub description: Option<String>,
}

impl SubdatasetRef {
    /// Human-readable name of the subdataset.
    ///
    /// For driver connection strings this is the part after the quoted file
    /// path; for plain paths it is the file stem.
    pub fn descriptive_name(&self) -> String {
        let raw = match self.name.rfind('"') {
            Some(pos) => self.name[pos + 1..]
                .trim_start_matches(|c: char| c == ':' || c == '/')
                .to_string(),
            None => Path::new(&self.name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let raw = raw.trim();
        if raw.is_empty() {
            format!("subdataset_{}", self.ordinal)
        } else {
            raw.to_string()
        }
    }

    /// Last component of the descriptive name (`Gap_Filled_DNB_BRDF-Corrected_NTL`)
    pub fn leaf_name(&self) -> String {
        let name = self.descriptive_name();
        name.rsplit(|c: char| c == '/' || c == ':')
            .find(|part| !part.trim().is_empty())
            .map(|part| part.trim().to_string())
            .unwrap_or(name)
    }

    /// Descriptive name made safe for use inside a file name
    pub fn file_safe_name(&self) -> String {
        sanitize_name(&self.descriptive_name())
    }
}

/// Replace whitespace and path separators with underscores
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' || c == ':' {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Build subdataset references from `SUBDATASET_<n>_NAME` / `_DESC` items.
///
/// Entries are ordered by their numeric index, so `SUBDATASET_10` follows
/// `SUBDATASET_9`. Items that do not follow the pattern are ignored.
pub fn parse_subdataset_items(items: &[String]) -> Vec<SubdatasetRef> {
    let mut names: BTreeMap<usize, String> = BTreeMap::new();
    let mut descriptions: BTreeMap<usize, String> = BTreeMap::new();

    for item in items {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        let Some(rest) = key.strip_prefix("SUBDATASET_") else {
            continue;
        };
        let Some((index, kind)) = rest.split_once('_') else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };

        match kind {
            "NAME" => {
                names.insert(index, value.to_string());
            }
            "DESC" => {
                descriptions.insert(index, value.to_string());
            }
            _ => {}
        }
    }

    names
        .into_iter()
        .enumerate()
        .map(|(position, (index, name))| SubdatasetRef {
            ordinal: position + 1,
            name,
            description: descriptions.remove(&index),
        })
        .collect()
}

/// A multi-subdataset source file (HDF5, HDF4-EOS, netCDF, ...) opened read-only
pub struct SourceContainer {
    path: PathBuf,
    dataset: Dataset,
    subdatasets: Vec<SubdatasetRef>,
}

impl SourceContainer {
    /// Open a container and enumerate its subdatasets
    pub fn open<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening container: {}", path.display());

        let dataset = Dataset::open(&path).map_err(|e| {
            ConvertError::Format(format!("{} is not a readable raster container: {}", path.display(), e))
        })?;

        let items = dataset.metadata_domain(SUBDATASETS_DOMAIN).unwrap_or_default();
        let subdatasets = parse_subdataset_items(&items);
        log::debug!("Found {} subdatasets in {}", subdatasets.len(), path.display());

        Ok(Self { path, dataset, subdatasets })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without its final extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string())
    }

    pub fn subdatasets(&self) -> &[SubdatasetRef] {
        &self.subdatasets
    }

    /// Subdatasets, failing when the container has none
    pub fn require_subdatasets(&self) -> ConvertResult<&[SubdatasetRef]> {
        if self.subdatasets.is_empty() {
            return Err(ConvertError::NoSubdatasets(self.path.clone()));
        }
        Ok(&self.subdatasets)
    }

    /// Container-level metadata item from the default domain
    pub fn metadata_item(&self, key: &str) -> Option<String> {
        self.dataset.metadata_item(key, "")
    }

    /// Open one subdataset read-only
    pub fn open_subdataset(&self, subdataset: &SubdatasetRef) -> ConvertResult<Dataset> {
        Dataset::open(Path::new(&subdataset.name)).map_err(|e| {
            ConvertError::Format(format!(
                "subdataset {} of {} cannot be opened: {}",
                subdataset.ordinal,
                self.path.display(),
                e
            ))
        })
    }
}
