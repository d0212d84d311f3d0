//! # Gridded Dataset
//!
//! In-memory representation of a NetCDF gridded dataset: a mapping from
//! variable code to a labeled N-dimensional array, all arrays sharing one
//! coordinate system along at least {time, y, x}.
//!
//! ## Loading
//!
//! [`GridDataset::from_netcdf`] reads every data variable of a file into an
//! `f64` array, applying the usual CF attributes on the way in:
//!
//! - `_FillValue` / `missing_value` cells become NaN
//! - `scale_factor` / `add_offset` are applied after fill masking
//! - the time coordinate is decoded to epoch seconds from its `units`
//!   attribute (`{seconds|hours|days} since <datetime>`)
//!
//! ## Merging
//!
//! Files of one batch merge into a single dataset: the same variable code
//! appearing in several files is concatenated along the time axis (segments
//! ordered by first timestamp), new codes are inserted after a spatial
//! coordinate compatibility check. A merge that fails validation applies
//! nothing, so an excluded file is excluded in full.

use crate::error::{ProcessError, Result};
use crate::grid::resolve_spatial_dims;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use ndarray::{concatenate, ArrayD, Axis};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Name of the time dimension in provider files.
pub const TIME_DIM: &str = "time";

/// One named, labeled N-dimensional array.
#[derive(Debug, Clone)]
pub struct DataArray {
    /// Variable code (e.g. `thetao`, `so`, `uo`).
    pub name: String,
    /// Dimension names in axis order.
    pub dims: Vec<String>,
    /// Coordinate values per dimension. Time coordinates are epoch seconds.
    pub coords: HashMap<String, Vec<f64>>,
    /// Cell values; missing cells are NaN.
    pub values: ArrayD<f64>,
    /// EPSG code carried by the source file, if any.
    pub epsg: Option<u32>,
}

impl DataArray {
    /// Axis position of a dimension, if present.
    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Coordinate values of a dimension, if present.
    pub fn coord(&self, dim: &str) -> Option<&[f64]> {
        self.coords.get(dim).map(Vec::as_slice)
    }

    /// Selects one index along an axis, dropping that dimension. This is a
    /// selection, not a reduction: the coordinate is discarded along with
    /// the axis.
    pub fn select_index(&self, axis: usize, index: usize) -> DataArray {
        let dropped = self.dims[axis].clone();
        let mut coords = self.coords.clone();
        coords.remove(&dropped);
        let dims = self
            .dims
            .iter()
            .filter(|d| **d != dropped)
            .cloned()
            .collect();
        DataArray {
            name: self.name.clone(),
            dims,
            coords,
            values: self.values.index_axis(Axis(axis), index).to_owned(),
            epsg: self.epsg,
        }
    }

    /// True when `other` has identical dimension names, shape, and
    /// coordinate labels.
    pub fn aligned_with(&self, other: &DataArray) -> bool {
        self.dims == other.dims
            && self.values.shape() == other.values.shape()
            && self
                .dims
                .iter()
                .all(|d| coords_close(self.coord(d), other.coord(d)))
    }
}

fn coords_close(a: Option<&[f64]>, b: Option<&[f64]>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
        }
        (None, None) => true,
        _ => false,
    }
}

/// A collection of [`DataArray`]s sharing one coordinate system.
#[derive(Debug, Default)]
pub struct GridDataset {
    variables: BTreeMap<String, DataArray>,
}

impl GridDataset {
    /// Looks up a variable by code. Absent codes fail loudly.
    pub fn variable(&self, name: &str) -> Result<&DataArray> {
        self.variables
            .get(name)
            .ok_or_else(|| ProcessError::VariableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// Inserts (or replaces) a variable. This is the merge-back point used
    /// by the derived-quantity computer; after this call the dataset must be
    /// treated as updated in place.
    pub fn insert(&mut self, array: DataArray) {
        self.variables.insert(array.name.clone(), array);
    }

    /// Loads every data variable of a NetCDF file.
    pub fn from_netcdf(path: &Path) -> Result<GridDataset> {
        let file = netcdf::open(path)?;
        let epsg = read_epsg(&file);
        let dim_names: HashSet<String> =
            file.dimensions().map(|d| d.name().to_string()).collect();

        let mut coords: HashMap<String, Vec<f64>> = HashMap::new();
        for dim in file.dimensions() {
            let name = dim.name().to_string();
            if let Some(var) = file.variable(&name) {
                let raw = var.get::<f64, _>(..)?;
                let mut values: Vec<f64> = raw.iter().copied().collect();
                if name == TIME_DIM {
                    values = decode_time_coord(&var, values);
                }
                coords.insert(name, values);
            }
        }

        let mut dataset = GridDataset::default();
        for var in file.variables() {
            let name = var.name().to_string();
            // Coordinate and grid-mapping variables are not data.
            if dim_names.contains(&name) || var.dimensions().len() < 2 {
                continue;
            }
            let dims: Vec<String> = var
                .dimensions()
                .iter()
                .map(|d| d.name().to_string())
                .collect();
            let mut values = var.get::<f64, _>(..)?;
            apply_cf_packing(&var, &mut values);
            let var_coords = dims
                .iter()
                .filter_map(|d| coords.get(d).map(|c| (d.clone(), c.clone())))
                .collect();
            debug!("loaded variable '{}' with dims {:?}", name, dims);
            dataset.insert(DataArray {
                name,
                dims,
                coords: var_coords,
                values,
                epsg,
            });
        }
        Ok(dataset)
    }

    /// Merges another dataset into this one. Shared variable codes are
    /// concatenated along the time axis; new codes are inserted after a
    /// coordinate compatibility check against the variables already present.
    ///
    /// The merge is transactional: every incoming variable is validated
    /// before any is applied, so a rejected dataset leaves `self` exactly
    /// as it was.
    pub fn merge(&mut self, other: GridDataset) -> Result<()> {
        for (name, incoming) in &other.variables {
            match self.variables.get(name) {
                Some(existing) => {
                    check_concat_compat(existing, incoming)?;
                }
                None => {
                    for present in self.variables.values() {
                        check_spatial_compat(present, incoming)?;
                    }
                    self.check_same_grid(incoming)?;
                }
            }
        }
        for (name, incoming) in other.variables {
            match self.variables.remove(&name) {
                Some(existing) => {
                    let merged = concat_time(existing, incoming)?;
                    self.variables.insert(name, merged);
                }
                None => {
                    self.variables.insert(name, incoming);
                }
            }
        }
        Ok(())
    }

    /// Requires an incoming variable to sit on the same named spatial grid
    /// as the variables already present. A variable sharing no dimension
    /// names at all would otherwise slip past the coordinate comparison.
    fn check_same_grid(&self, incoming: &DataArray) -> Result<()> {
        let expected = self
            .variables
            .values()
            .find_map(|v| resolve_spatial_dims(v).ok());
        if let Some(expected) = expected {
            let got = resolve_spatial_dims(incoming)?;
            if got != expected {
                return Err(ProcessError::ShapeMismatch(format!(
                    "variable '{}' uses spatial dimensions ({}, {}) but the dataset uses ({}, {})",
                    incoming.name, got.0, got.1, expected.0, expected.1
                )));
            }
        }
        Ok(())
    }
}

/// Requires that dimensions shared by the two arrays (other than time) carry
/// identical coordinates.
fn check_spatial_compat(a: &DataArray, b: &DataArray) -> Result<()> {
    for dim in &a.dims {
        if dim == TIME_DIM {
            continue;
        }
        if let (Some(x), Some(y)) = (a.coord(dim), b.coord(dim)) {
            if !coords_close(Some(x), Some(y)) {
                return Err(ProcessError::ShapeMismatch(format!(
                    "variables '{}' and '{}' disagree on coordinate '{}'",
                    a.name, b.name, dim
                )));
            }
        }
    }
    Ok(())
}

/// Requires that two segments of the same variable can be concatenated
/// along the time axis. Returns the time axis position.
fn check_concat_compat(a: &DataArray, b: &DataArray) -> Result<usize> {
    if a.dims != b.dims {
        return Err(ProcessError::ShapeMismatch(format!(
            "cannot merge variable '{}': dimension order {:?} vs {:?}",
            a.name, a.dims, b.dims
        )));
    }
    let axis = a.axis(TIME_DIM).ok_or_else(|| {
        ProcessError::ShapeMismatch(format!(
            "cannot merge variable '{}': no time dimension",
            a.name
        ))
    })?;
    for dim in &a.dims {
        if dim != TIME_DIM && !coords_close(a.coord(dim), b.coord(dim)) {
            return Err(ProcessError::ShapeMismatch(format!(
                "cannot merge variable '{}': coordinate '{}' differs between files",
                a.name, dim
            )));
        }
    }
    Ok(axis)
}

/// Concatenates two segments of the same variable along the time axis,
/// earlier segment first.
fn concat_time(a: DataArray, b: DataArray) -> Result<DataArray> {
    let axis = check_concat_compat(&a, &b)?;

    let a_start = a.coord(TIME_DIM).and_then(|t| t.first().copied());
    let b_start = b.coord(TIME_DIM).and_then(|t| t.first().copied());
    let (first, second) = if a_start <= b_start { (a, b) } else { (b, a) };

    let values = concatenate(
        Axis(axis),
        &[first.values.view(), second.values.view()],
    )
    .map_err(|e| ProcessError::ShapeMismatch(e.to_string()))?;

    let mut coords = first.coords.clone();
    if let (Some(t1), Some(t2)) = (first.coord(TIME_DIM), second.coord(TIME_DIM)) {
        let mut time: Vec<f64> = t1.to_vec();
        time.extend_from_slice(t2);
        coords.insert(TIME_DIM.to_string(), time);
    }

    Ok(DataArray {
        name: first.name,
        dims: first.dims,
        coords,
        values,
        epsg: first.epsg.or(second.epsg),
    })
}

/// Masks fill values as NaN, then applies `scale_factor`/`add_offset`.
fn apply_cf_packing(var: &netcdf::Variable, values: &mut ArrayD<f64>) {
    let fill = attr_f64(var, "_FillValue").or_else(|| attr_f64(var, "missing_value"));
    let scale = attr_f64(var, "scale_factor").unwrap_or(1.0);
    let offset = attr_f64(var, "add_offset").unwrap_or(0.0);
    values.mapv_inplace(|v| {
        if fill.is_some_and(|f| v == f) || v.is_nan() {
            f64::NAN
        } else {
            v * scale + offset
        }
    });
}

/// Decodes a CF time coordinate to epoch seconds. Without a parseable
/// `units` attribute the values are assumed to be epoch seconds already.
fn decode_time_coord(var: &netcdf::Variable, values: Vec<f64>) -> Vec<f64> {
    let units = attr_str(var, "units");
    match units.as_deref().and_then(parse_time_units) {
        Some((multiplier, base)) => {
            let base_secs = base.and_utc().timestamp() as f64;
            values
                .into_iter()
                .map(|v| base_secs + v * multiplier)
                .collect()
        }
        None => {
            warn!(
                "time units {:?} not understood; assuming epoch seconds",
                units
            );
            values
        }
    }
}

/// Parses a `<unit> since <datetime>` CF units string.
fn parse_time_units(units: &str) -> Option<(f64, NaiveDateTime)> {
    let (unit, base) = units.split_once(" since ")?;
    let multiplier = match unit.trim() {
        "seconds" | "second" => 1.0,
        "minutes" | "minute" => 60.0,
        "hours" | "hour" => 3_600.0,
        "days" | "day" => 86_400.0,
        _ => return None,
    };
    let base = base.trim();
    let parsed = NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(base, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok()?;
    Some((multiplier, parsed))
}

/// Looks for an EPSG code in the file: a numeric global attribute first,
/// then the `epsg_code` attribute of a `crs` grid-mapping variable.
fn read_epsg(file: &netcdf::File) -> Option<u32> {
    for name in ["epsg", "crs_epsg"] {
        if let Some(attr) = file.attribute(name) {
            if let Some(code) = attr.value().ok().and_then(attr_value_f64) {
                return Some(code as u32);
            }
        }
    }
    let crs = file.variable("crs")?;
    attr_f64(&crs, "epsg_code")
        .or_else(|| attr_str(&crs, "epsg_code").and_then(|s| s.parse().ok()))
        .map(|code| code as u32)
}

fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    attr_value_f64(var.attribute(name)?.value().ok()?)
}

fn attr_str(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn attr_value_f64(value: netcdf::AttributeValue) -> Option<f64> {
    use netcdf::AttributeValue::*;
    match value {
        Uchar(v) => Some(v as f64),
        Schar(v) => Some(v as f64),
        Ushort(v) => Some(v as f64),
        Short(v) => Some(v as f64),
        Uint(v) => Some(v as f64),
        Int(v) => Some(v as f64),
        Ulonglong(v) => Some(v as f64),
        Longlong(v) => Some(v as f64),
        Float(v) => Some(v as f64),
        Double(v) => Some(v),
        Floats(v) => v.first().map(|&x| x as f64),
        Doubles(v) => v.first().copied(),
        Str(s) => s.parse().ok(),
        _ => None,
    }
}
