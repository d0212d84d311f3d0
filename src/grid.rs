//! # Grid Accessor
//!
//! Resolves the spatial dimension names actually present in an array against
//! the small set of synonyms provider files use. Centralizing the candidate
//! lookup here keeps the failure semantics identical for every consumer.

use crate::dataset::DataArray;
use crate::error::{ProcessError, Result};

/// Accepted x-dimension names, in tie-break order. First match wins.
pub const X_CANDIDATES: [&str; 3] = ["x", "lon", "longitude"];

/// Accepted y-dimension names, in tie-break order.
pub const Y_CANDIDATES: [&str; 3] = ["y", "lat", "latitude"];

/// Returns the `(x, y)` dimension names present in the array.
///
/// Exactly one x-like and one y-like name must be present; the absence of
/// either is fatal to any spatial operation.
pub fn resolve_spatial_dims(array: &DataArray) -> Result<(String, String)> {
    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find(|c| array.dims.iter().any(|d| d == *c))
            .map(|c| c.to_string())
    };
    match (find(&X_CANDIDATES), find(&Y_CANDIDATES)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(ProcessError::SpatialDimensionMissing(array.dims.clone())),
    }
}

/// Cell size along the x dimension, `|coord[1] - coord[0]|`.
///
/// Used only for output-name labelling; its failure never blocks an export.
pub fn infer_cell_size(array: &DataArray) -> Result<f64> {
    let (x, _) = resolve_spatial_dims(array)?;
    let coords = array
        .coord(&x)
        .ok_or_else(|| ProcessError::InsufficientResolution(x.clone()))?;
    if coords.len() < 2 {
        return Err(ProcessError::InsufficientResolution(x));
    }
    Ok((coords[1] - coords[0]).abs())
}
