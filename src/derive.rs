//! Derived per-cell-per-time quantities, currently the magnitude of a
//! two-component vector field (`uo`/`vo` current velocity in the source
//! data).

use crate::dataset::{DataArray, GridDataset};
use crate::error::{ProcessError, Result};
use ndarray::Zip;

/// Canonical code under which the computed magnitude is merged back into
/// the dataset.
pub const MAGNITUDE_VAR: &str = "velocity";

/// Elementwise `sqrt(u² + v²)` of two axis-aligned component arrays.
pub fn vector_magnitude(u: &DataArray, v: &DataArray) -> Result<DataArray> {
    if !u.aligned_with(v) {
        return Err(ProcessError::ShapeMismatch(format!(
            "components '{}' and '{}' are not axis-aligned",
            u.name, v.name
        )));
    }
    let values = Zip::from(&u.values)
        .and(&v.values)
        .map_collect(|&a, &b| (a * a + b * b).sqrt());
    Ok(DataArray {
        name: MAGNITUDE_VAR.to_string(),
        dims: u.dims.clone(),
        coords: u.coords.clone(),
        values,
        epsg: u.epsg.or(v.epsg),
    })
}

/// Computes the magnitude of two component variables and writes it back into
/// the dataset under [`MAGNITUDE_VAR`], making it reducible like any input
/// variable. The dataset is updated in place.
pub fn compute_magnitude(dataset: &mut GridDataset, a: &str, b: &str) -> Result<()> {
    let magnitude = {
        let u = dataset.variable(a)?;
        let v = dataset.variable(b)?;
        vector_magnitude(u, v)?
    };
    dataset.insert(magnitude);
    Ok(())
}
