//! Planning the upload of converted GeoTIFFs to object storage and their import
//! into an image collection. The plan is written as a JSON manifest; the
//! transfer and the import themselves are left to the platform's own tools.

use crate::io::granule::GranuleName;
use crate::types::{ConvertError, ConvertResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One GeoTIFF to upload and import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEntry {
    pub local_path: PathBuf,
    /// Destination object, e.g. `gs://bucket/VNP46A2.A2020015.h10v05.001.2020287170609.tif`
    pub object_uri: String,
    /// Asset id inside the collection, e.g. `users/me/vnp46a2/2020287170609`
    pub asset_id: String,
    #[serde(with = "time_start_format")]
    pub time_start: NaiveDateTime,
}

/// File that could not be planned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestPlan {
    pub entries: Vec<IngestEntry>,
    pub skipped: Vec<SkippedFile>,
}

impl IngestPlan {
    /// Write the entries as a pretty-printed JSON array
    pub fn write_manifest<P: AsRef<Path>>(&self, path: P) -> ConvertResult<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.entries)?;
        log::info!(
            "Wrote ingestion manifest with {} entries to {}",
            self.entries.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn to_json(&self) -> ConvertResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

/// Builds ingestion plans for a bucket and a destination collection
pub struct IngestPlanner {
    bucket: String,
    collection: String,
}

impl IngestPlanner {
    pub fn new(bucket: &str, collection: &str) -> ConvertResult<Self> {
        let bucket = bucket.trim().trim_start_matches("gs://").trim_end_matches('/');
        let collection = collection.trim().trim_matches('/');
        if bucket.is_empty() {
            return Err(ConvertError::Config("bucket name is empty".to_string()));
        }
        if collection.is_empty() {
            return Err(ConvertError::Config("collection name is empty".to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            collection: collection.to_string(),
        })
    }

    /// Plan every `.tif` file below `dir`, in sorted path order
    pub fn plan_directory<P: AsRef<Path>>(&self, dir: P) -> ConvertResult<IngestPlan> {
        let files = find_geotiffs(dir.as_ref())?;
        log::info!("Planning ingestion of {} GeoTIFF(s) from {}", files.len(), dir.as_ref().display());
        Ok(self.plan_files(&files))
    }

    /// Plan the given files in order.
    ///
    /// Asset ids are the granule production stamps; when a stamp repeats, the
    /// n-th repetition gets an `_n` suffix so no asset overwrites another.
    pub fn plan_files(&self, files: &[PathBuf]) -> IngestPlan {
        let mut plan = IngestPlan::default();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for path in files {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let granule = match GranuleName::parse(&file_name) {
                Ok(granule) => granule,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    plan.skipped.push(SkippedFile { path: path.clone(), reason: e.to_string() });
                    continue;
                }
            };

            let count = seen.entry(granule.production_stamp.clone()).or_insert(0);
            let asset_name = if *count == 0 {
                granule.production_stamp.clone()
            } else {
                format!("{}_{}", granule.production_stamp, count)
            };
            *count += 1;

            plan.entries.push(IngestEntry {
                local_path: path.clone(),
                object_uri: format!("gs://{}/{}", self.bucket, file_name),
                asset_id: format!("users/{}/{}", self.collection, asset_name),
                time_start: granule.time_start(),
            });
        }

        plan
    }
}

/// All `.tif` files below `dir`, recursively, sorted by path.
///
/// Symbolic links are not followed, so a link cycle cannot list a file twice.
pub fn find_geotiffs(dir: &Path) -> ConvertResult<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let is_tif = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("tif"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_tif {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

mod time_start_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/out").join(n)).collect()
    }

    #[test]
    fn test_entries_from_granule_names() {
        let planner = IngestPlanner::new("gs://nightlights/", "me/vnp46a2").unwrap();
        let plan = planner.plan_files(&paths(&["VNP46A2.A2020015.h10v05.001.2020287170609.tif"]));

        assert_eq!(plan.entries.len(), 1);
        let entry = &plan.entries[0];
        assert_eq!(entry.object_uri, "gs://nightlights/VNP46A2.A2020015.h10v05.001.2020287170609.tif");
        assert_eq!(entry.asset_id, "users/me/vnp46a2/2020287170609");
        assert_eq!(entry.time_start.format("%Y-%m-%dT%H:%M:%S").to_string(), "2020-01-15T17:06:09");
    }

    #[test]
    fn test_repeated_stamps_get_suffixes() {
        let planner = IngestPlanner::new("b", "c").unwrap();
        let plan = planner.plan_files(&paths(&[
            "VNP46A2.A2020015.h10v05.001.2020287170609.tif",
            "VNP46A2.A2020015.h11v05.001.2020287170609.tif",
            "VNP46A2.A2020016.h10v05.001.2020288000000.tif",
            "VNP46A2.A2020015.h12v05.001.2020287170609.tif",
        ]));

        let ids: Vec<&str> = plan.entries.iter().map(|e| e.asset_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "users/c/2020287170609",
                "users/c/2020287170609_1",
                "users/c/2020288000000",
                "users/c/2020287170609_2",
            ]
        );
    }

    #[test]
    fn test_unparseable_names_are_skipped() {
        let planner = IngestPlanner::new("b", "c").unwrap();
        let plan = planner.plan_files(&paths(&["A2020015.tif"]));
        assert!(plan.entries.is_empty());
        assert_eq!(plan.skipped.len(), 1);
    }

    #[test]
    fn test_json_time_format() {
        let planner = IngestPlanner::new("b", "c").unwrap();
        let plan = planner.plan_files(&paths(&["VNP46A2.A2020015.h10v05.001.2020287170609.tif"]));
        let json = plan.to_json().unwrap();
        assert!(json.contains("\"time_start\": \"2020-01-15T17:06:09\""));

        let back: Vec<IngestEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan.entries);
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(IngestPlanner::new("gs://", "c").is_err());
        assert!(IngestPlanner::new("b", " / ").is_err());
    }
}
