//! Batch conversion of a directory of containers into multi-band GeoTIFFs

use crate::config::{ConvertParams, FailurePolicy, OverwritePolicy};
use crate::core::extract::SubdatasetExtractor;
use crate::core::merge::BandMerger;
use crate::io::container::SourceContainer;
use crate::types::{ConvertError, ConvertResult, Stage};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Progress after one file has been handled
#[derive(Debug, Clone)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub file: PathBuf,
    pub succeeded: bool,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// A file the batch could not convert
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: Stage,
    pub error: ConvertError,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Files converted successfully
    pub processed: usize,
    /// Files found in the input directory
    pub total: usize,
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Converts every container in a directory: extract each subdataset,
/// stack them, one GeoTIFF per container.
pub struct BatchConverter {
    params: ConvertParams,
    extractor: SubdatasetExtractor,
    merger: BandMerger,
}

impl BatchConverter {
    pub fn new(params: ConvertParams) -> ConvertResult<Self> {
        params.validate()?;
        let options = params.creation_option_pairs();
        Ok(Self {
            extractor: SubdatasetExtractor::with_creation_options(options.clone()),
            merger: BandMerger::with_creation_options(options),
            params,
        })
    }

    pub fn params(&self) -> &ConvertParams {
        &self.params
    }

    /// Convert every file directly inside `input_dir` into `output_dir`.
    ///
    /// `progress` is called once per file, after it succeeded or failed.
    /// With [`FailurePolicy::Abort`] the first failure ends the run as
    /// [`ConvertError::File`]; otherwise failures are collected in the summary.
    pub fn run<F>(&self, input_dir: &Path, output_dir: &Path, mut progress: F) -> ConvertResult<BatchSummary>
    where
        F: FnMut(&Progress),
    {
        let inputs = self.list_inputs(input_dir)?;
        std::fs::create_dir_all(output_dir)?;
        std::fs::create_dir_all(&self.params.temp_dir)?;

        log::info!(
            "Converting {} file(s) from {} into {}",
            inputs.len(),
            input_dir.display(),
            output_dir.display()
        );

        let mut summary = BatchSummary {
            total: inputs.len(),
            ..Default::default()
        };
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for (index, source) in inputs.iter().enumerate() {
            log::info!("[{}/{}] {}", index + 1, inputs.len(), source.display());

            let result = self
                .claim_output(source, output_dir, &mut claimed)
                .map_err(|e| (Stage::Output, e))
                .and_then(|output_path| self.convert_file(source, &output_path));

            let succeeded = result.is_ok();
            match result {
                Ok(output) => {
                    summary.processed += 1;
                    summary.outputs.push(output);
                }
                Err((stage, error)) => {
                    log::warn!("{} failed for {}: {}", stage, source.display(), error);
                    if self.params.failure_policy == FailurePolicy::Abort {
                        progress(&Progress {
                            completed: index + 1,
                            total: inputs.len(),
                            file: source.clone(),
                            succeeded,
                        });
                        return Err(error.in_file(source.clone(), stage));
                    }
                    summary.failures.push(FileFailure {
                        path: source.clone(),
                        stage,
                        error,
                    });
                }
            }

            progress(&Progress {
                completed: index + 1,
                total: inputs.len(),
                file: source.clone(),
                succeeded,
            });
        }

        log::info!(
            "Converted {} of {} file(s), {} failed",
            summary.processed,
            summary.total,
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Regular, non-hidden files directly inside `dir`
    pub fn list_inputs(&self, dir: &Path) -> ConvertResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if path.is_file() && !hidden {
                files.push(path);
            }
        }

        if self.params.sort_inputs {
            files.sort();
        }
        Ok(files)
    }

    /// Convert one container into `output_path`; temporaries live in a scratch
    /// directory that is removed when this returns.
    pub fn convert_file(&self, source: &Path, output_path: &Path) -> Result<PathBuf, (Stage, ConvertError)> {
        let container = SourceContainer::open(source).map_err(|e| (Stage::Open, e))?;
        let subdatasets = container.require_subdatasets().map_err(|e| (Stage::Open, e))?;

        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-", container.stem()))
            .tempdir_in(&self.params.temp_dir)
            .map_err(|e| (Stage::Extract, ConvertError::from(e)))?;

        let mut rasters = Vec::with_capacity(subdatasets.len());
        for subdataset in subdatasets {
            let raster = self
                .extractor
                .extract(&container, subdataset, scratch.path())
                .map_err(|e| (Stage::Extract, e))?;
            rasters.push(raster);
        }

        self.merger
            .merge(rasters, output_path)
            .map_err(|e| (Stage::Merge, e))
    }

    /// Output path for `source`, refusing paths another input already claimed
    /// in this run and, under [`OverwritePolicy::Fail`], existing files.
    fn claim_output(
        &self,
        source: &Path,
        output_dir: &Path,
        claimed: &mut HashSet<PathBuf>,
    ) -> ConvertResult<PathBuf> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ConvertError::Format(format!("{} has no file name", source.display())))?;
        let output_path = output_dir.join(self.params.naming.output_name(&file_name));

        if !claimed.insert(output_path.clone()) {
            return Err(ConvertError::NamingCollision(output_path));
        }

        if output_path.exists() {
            match self.params.overwrite {
                OverwritePolicy::Fail => return Err(ConvertError::NamingCollision(output_path)),
                OverwritePolicy::Overwrite => {
                    log::warn!("Overwriting existing output {}", output_path.display());
                }
            }
        }

        Ok(output_path)
    }
}
