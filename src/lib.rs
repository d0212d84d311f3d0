//! # nc2tiff
//!
//! A Rust library for reducing multi-year daily NetCDF time series into
//! per-cell climatological summary rasters written as GeoTIFFs.
//!
//! ## Features
//!
//! - **Temporal reductions**: per-cell max, min, and mean annual range
//!   (per-year extremes averaged across years, Bio-Oracle style)
//! - **Derived quantities**: current-velocity magnitude from `uo`/`vo`
//!   components, merged back into the dataset before reduction
//! - **Dimension-name tolerance**: `x`/`lon`/`longitude` and
//!   `y`/`lat`/`latitude` spatial axes resolved against a fixed synonym list
//! - **Georeferenced output**: single-band GeoTIFFs with pixel scale,
//!   tiepoint, EPSG geo-keys, nodata, dtype, and compression policy
//! - **Batch isolation**: one folder of files is one batch; failures in one
//!   file, plan entry, or batch never abort the rest of the run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nc2tiff::{process_tree, input::JobConfig};
//!
//! // Load configuration from a JSON or YAML file
//! let config = JobConfig::from_file("job.json").expect("Failed to load config");
//!
//! // Walk the input tree and write one raster per (variable, operation)
//! let summary = process_tree(&config).expect("Run failed");
//! println!("{} rasters written", summary.rasters.len());
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "input_root": "data/raw/daily",
//!   "output_root": "data/derived",
//!   "export": { "epsg": 4326, "nodata": -9999.0, "dtype": "float32" },
//!   "name_map": { "thetao": "sea_water_temperature" },
//!   "plan": [
//!     { "kind": "direct", "variable": "thetao", "operations": ["max", "min", "range"] },
//!     { "kind": "derived", "components": ["uo", "vo"], "operations": ["max"] }
//!   ]
//! }
//! ```

pub mod batch;
pub mod cli;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod export;
pub mod grid;
pub mod input;
pub mod log;
pub mod reduce;


pub use crate::batch::{process_batch, process_tree, RunSummary};
pub use crate::error::{ProcessError, Result};
