//! # CLI Module
//!
//! Command-line interface for nc2tiff:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML) with `NC2TIFF_` environment
//!   variable fallbacks
//! - Subcommands for processing, file inspection, and config templates

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Reduce daily NetCDF ocean time series into climatological GeoTIFF summary rasters
#[derive(Parser, Debug)]
#[command(name = "nc2tiff")]
#[command(about = "Reduce NetCDF time series into per-cell summary GeoTIFFs")]
#[command(version)]
#[command(long_about = "
nc2tiff walks a tree of NetCDF batch folders, merges each folder's files into
one gridded dataset, collapses the time axis into per-cell summaries (max,
min, mean annual range), and writes one georeferenced GeoTIFF per variable
and operation, mirroring the input hierarchy under the output root.

EXAMPLES:
  # Process a tree of batch folders
  nc2tiff process --config job.json

  # Override the roots from a shared config
  nc2tiff process --config job.yaml --input data/raw --output data/derived

  # Inspect a provider file
  nc2tiff info Physical_1993_1_1_to_1999_12_31.nc --detailed

  # Generate a starter configuration
  nc2tiff template --format yaml > job.yaml
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every batch folder under the configured input root
    Process {
        /// Configuration file path (JSON or YAML)
        #[arg(short, long, env = "NC2TIFF_CONFIG")]
        config: PathBuf,

        /// Override the input root from the config
        #[arg(long = "input", env = "NC2TIFF_INPUT")]
        input_override: Option<PathBuf>,

        /// Override the output root from the config
        #[arg(long = "output", env = "NC2TIFF_OUTPUT")]
        output_override: Option<PathBuf>,
    },

    /// Show dimensions, variables, and attributes of a NetCDF file
    Info {
        /// NetCDF file to inspect
        file: PathBuf,

        /// Also print attributes
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print a sample job configuration to stdout
    Template {
        #[arg(long, value_enum, default_value_t = TemplateFormat::Json)]
        format: TemplateFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

/// Initializes env_logger, honoring `--verbose`/`--quiet` over `RUST_LOG`.
pub fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(LevelFilter::Error);
    } else {
        builder.filter_level(LevelFilter::Info);
    }
    let _ = builder.try_init();
}
