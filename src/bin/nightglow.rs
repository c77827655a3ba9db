//! Command-line front end.
//!
//! ```bash
//! nightglow convert <INPUT_DIR> <OUTPUT_DIR> [--naming stem] [--co COMPRESS=DEFLATE]
//! nightglow locate 10 5
//! nightglow inspect VNP46A2.A2020015.h10v05.001.2020287170609.h5
//! nightglow ingest-plan <DIR> --bucket nightlights --collection me/vnp46a2
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nightglow::config::{ConvertParams, FailurePolicy, OutputNaming, OverwritePolicy};
use nightglow::core::extract::{HORIZONTAL_TILE_KEY, VERTICAL_TILE_KEY};
use nightglow::core::{locate, BatchConverter};
use nightglow::io::{IngestPlanner, SourceContainer};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(name = "nightglow")]
#[clap(about = "Georeference and band-stack Black Marble night-light tiles")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every container in a directory into multi-band GeoTIFFs
    Convert {
        input_dir: PathBuf,
        output_dir: PathBuf,

        /// TOML file with conversion parameters
        #[clap(long, value_name = "FILE", env = "NIGHTGLOW_CONFIG")]
        config: Option<PathBuf>,

        /// Root directory for intermediate rasters
        #[clap(long, value_name = "DIR")]
        temp_dir: Option<PathBuf>,

        /// How output file names are derived from input names
        #[clap(long, value_enum)]
        naming: Option<NamingArg>,

        /// Replace existing output files instead of failing
        #[clap(long)]
        overwrite: bool,

        /// Stop at the first failed file
        #[clap(long)]
        fail_fast: bool,

        /// GeoTIFF creation option, e.g. COMPRESS=DEFLATE (repeatable)
        #[clap(long = "co", value_name = "KEY=VALUE")]
        creation_options: Vec<String>,
    },

    /// Print the bounding box of a grid tile
    Locate { h: i32, v: i32 },

    /// List the subdatasets and tile indices of a container
    Inspect { file: PathBuf },

    /// Write an upload/import manifest for converted GeoTIFFs
    IngestPlan {
        dir: PathBuf,

        /// Destination bucket (with or without gs://)
        #[clap(long)]
        bucket: String,

        /// Image collection path below users/
        #[clap(long)]
        collection: String,

        /// Manifest file; printed to stdout when omitted
        #[clap(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NamingArg {
    Prefix,
    Stem,
}

impl From<NamingArg> for OutputNaming {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::Prefix => OutputNaming::Prefix,
            NamingArg::Stem => OutputNaming::Stem,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Command::Convert {
            input_dir,
            output_dir,
            config,
            temp_dir,
            naming,
            overwrite,
            fail_fast,
            creation_options,
        } => {
            let mut params = match config {
                Some(path) => ConvertParams::from_toml_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ConvertParams::default(),
            };
            if let Some(dir) = temp_dir {
                params.temp_dir = dir;
            }
            if let Some(naming) = naming {
                params.naming = naming.into();
            }
            if overwrite {
                params.overwrite = OverwritePolicy::Overwrite;
            }
            if fail_fast {
                params.failure_policy = FailurePolicy::Abort;
            }
            for option in &creation_options {
                params.push_creation_option(option)?;
            }

            convert(params, &input_dir, &output_dir)
        }
        Command::Locate { h, v } => {
            let bbox = locate(h, v);
            println!(
                "h{:02}v{:02}: west={} south={} east={} north={}",
                h, v, bbox.west, bbox.south, bbox.east, bbox.north
            );
            Ok(())
        }
        Command::Inspect { file } => inspect(&file),
        Command::IngestPlan { dir, bucket, collection, out } => {
            let planner = IngestPlanner::new(&bucket, &collection)?;
            let plan = planner.plan_directory(&dir)?;
            match out {
                Some(path) => plan.write_manifest(&path)?,
                None => println!("{}", plan.to_json()?),
            }
            if !plan.skipped.is_empty() {
                log::warn!("{} file(s) skipped: names do not follow the granule grammar", plan.skipped.len());
            }
            Ok(())
        }
    }
}

fn convert(params: ConvertParams, input_dir: &Path, output_dir: &Path) -> Result<()> {
    let converter = BatchConverter::new(params)?;
    let summary = converter.run(input_dir, output_dir, |p| {
        log::info!("{:.1}% Complete", p.percent());
    })?;

    for failure in &summary.failures {
        log::error!("{}: {} stage failed: {}", failure.path.display(), failure.stage, failure.error);
    }

    if !summary.is_success() {
        bail!(
            "{} of {} file(s) failed",
            summary.failures.len(),
            summary.total
        );
    }
    log::info!("Converted {} file(s) into {}", summary.processed, output_dir.display());
    Ok(())
}

fn inspect(file: &Path) -> Result<()> {
    let container = SourceContainer::open(file)?;
    println!("{}", container.path().display());

    if container.subdatasets().is_empty() {
        println!("  (no subdatasets)");
        return Ok(());
    }

    for subdataset in container.subdatasets() {
        let dataset = container.open_subdataset(subdataset)?;
        let h = tile_metadata(&dataset, &container, HORIZONTAL_TILE_KEY);
        let v = tile_metadata(&dataset, &container, VERTICAL_TILE_KEY);
        let (width, height) = dataset.raster_size();
        println!(
            "  {:>2}. {} [{}x{}] H={} V={}",
            subdataset.ordinal,
            subdataset.leaf_name(),
            width,
            height,
            h.as_deref().unwrap_or("?"),
            v.as_deref().unwrap_or("?")
        );
    }
    Ok(())
}

fn tile_metadata(dataset: &gdal::Dataset, container: &SourceContainer, key: &str) -> Option<String> {
    use gdal::Metadata;
    dataset.metadata_item(key, "").or_else(|| container.metadata_item(key))
}
