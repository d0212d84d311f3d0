//! # Error Types
//!
//! Typed error taxonomy for the reduction pipeline. Every variant below is
//! caught at the batch orchestrator's per-plan-entry boundary and logged;
//! nothing here aborts a run as a whole.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reducing and exporting gridded datasets.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Requested variable is absent from the dataset. No fuzzy matching,
    /// no default value; lookups fail loudly.
    #[error("variable '{0}' not found in dataset")]
    VariableNotFound(String),

    /// No recognized x/y dimension names among the array's dimensions.
    #[error("no recognized spatial dimensions among {0:?}")]
    SpatialDimensionMissing(Vec<String>),

    /// Fewer than two coordinate samples along the x dimension, so the cell
    /// size cannot be inferred. Only blocks output-name labelling.
    #[error("cannot infer cell size: dimension '{0}' has fewer than 2 coordinate samples")]
    InsufficientResolution(String),

    /// Arrays that should be axis-aligned are not.
    #[error("arrays are not axis-aligned: {0}")]
    ShapeMismatch(String),

    /// Coordinate reference system stamping cannot be performed.
    #[error("cannot stamp coordinate reference system: {0}")]
    CrsWriteFailure(String),

    /// Zero files in the batch folder could be loaded.
    #[error("no loadable files in batch '{0}'")]
    BatchLoadFailure(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
