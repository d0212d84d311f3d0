//! # Job Configuration
//!
//! Configuration parsing and validation for nc2tiff jobs. A job file (JSON
//! or YAML, picked by extension) specifies:
//!
//! - **input_root** / **output_root**: the input directory tree and the
//!   mirrored output tree
//! - **export**: raster export policy (fallback EPSG, nodata sentinel,
//!   storage dtype, compression codec, qualified file names)
//! - **name_map**: variable code → display name, used only for output file
//!   naming; unmapped codes fall back to the raw code
//! - **plan**: the operation plan, a list of tagged entries
//!
//! ## Operation plan
//!
//! Plan entries come in two shapes:
//!
//! ```json
//! { "kind": "direct",  "variable": "thetao", "operations": ["max", "range"] }
//! { "kind": "derived", "components": ["uo", "vo"], "operations": ["max"] }
//! ```
//!
//! A `derived` entry computes the magnitude of its two component variables
//! before applying its reductions. Entries are processed independently; a
//! failure in one never prevents processing of the others.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A reduction collapsing the time axis into one per-cell summary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Max,
    Min,
    Range,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Max => "max",
            Operation::Min => "min",
            Operation::Range => "range",
        }
    }
}

/// One entry of the operation plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanEntry {
    /// Apply each named reduction to an input variable.
    Direct {
        variable: String,
        operations: Vec<Operation>,
    },
    /// Combine two component variables into a magnitude, then reduce it.
    Derived {
        components: [String; 2],
        operations: Vec<Operation>,
    },
}

impl PlanEntry {
    /// Human-readable subject for log messages.
    pub fn subject(&self) -> String {
        match self {
            PlanEntry::Direct { variable, .. } => variable.clone(),
            PlanEntry::Derived { components, .. } => {
                format!("{}+{}", components[0], components[1])
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlanEntry::Direct { .. } => "direct",
            PlanEntry::Derived { .. } => "derived",
        }
    }

    pub fn operations(&self) -> &[Operation] {
        match self {
            PlanEntry::Direct { operations, .. } => operations,
            PlanEntry::Derived { operations, .. } => operations,
        }
    }
}

/// Storage dtype of exported rasters. Values are cast on write; precision
/// loss for `float32` output is accepted and expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDtype {
    #[default]
    Float32,
    Float64,
}

/// Compression codec of exported rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    None,
    #[default]
    Deflate,
    Lzw,
}

/// Immutable raster export policy, passed alongside every export call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPolicy {
    /// Fallback EPSG code, stamped only when the source carries none.
    #[serde(default = "default_epsg")]
    pub epsg: u32,
    /// Nodata sentinel written in place of missing cells.
    #[serde(default = "default_nodata")]
    pub nodata: f64,
    #[serde(default)]
    pub dtype: OutputDtype,
    #[serde(default)]
    pub compression: Codec,
    /// Append a `{cell}deg_epsg{code}` token to output file names.
    #[serde(default)]
    pub qualified_names: bool,
}

fn default_epsg() -> u32 {
    4326
}

fn default_nodata() -> f64 {
    -9999.0
}

impl Default for ExportPolicy {
    fn default() -> Self {
        ExportPolicy {
            epsg: default_epsg(),
            nodata: default_nodata(),
            dtype: OutputDtype::default(),
            compression: Codec::default(),
            qualified_names: false,
        }
    }
}

/// Complete configuration of one processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Root of the input directory tree; each leaf folder with `.nc` files
    /// is one batch.
    pub input_root: PathBuf,
    /// Root under which the input hierarchy is mirrored.
    pub output_root: PathBuf,
    #[serde(default)]
    pub export: ExportPolicy,
    #[serde(default)]
    pub name_map: HashMap<String, String>,
    pub plan: Vec<PlanEntry>,
}

impl JobConfig {
    /// Loads a configuration file, YAML for `.yaml`/`.yml` extensions and
    /// JSON otherwise.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Display name for a variable code, falling back to the raw code.
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.name_map.get(code).map(String::as_str).unwrap_or(code)
    }

    /// A ready-to-edit sample configuration for a Copernicus Marine daily
    /// physics subset (WGS84).
    pub fn template() -> Self {
        let name_map = HashMap::from([
            ("thetao".to_string(), "sea_water_temperature".to_string()),
            ("so".to_string(), "sea_water_salinity".to_string()),
            ("o2".to_string(), "dissolved_oxygen".to_string()),
            ("velocity".to_string(), "sea_water_velocity".to_string()),
        ]);
        JobConfig {
            input_root: PathBuf::from("data/raw/daily"),
            output_root: PathBuf::from("data/derived"),
            export: ExportPolicy::default(),
            name_map,
            plan: vec![
                PlanEntry::Direct {
                    variable: "thetao".to_string(),
                    operations: vec![Operation::Max, Operation::Min, Operation::Range],
                },
                PlanEntry::Direct {
                    variable: "so".to_string(),
                    operations: vec![Operation::Max, Operation::Min, Operation::Range],
                },
                PlanEntry::Direct {
                    variable: "o2".to_string(),
                    operations: vec![Operation::Min],
                },
                PlanEntry::Derived {
                    components: ["uo".to_string(), "vo".to_string()],
                    operations: vec![Operation::Max, Operation::Range],
                },
            ],
        }
    }
}
