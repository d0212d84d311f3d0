//! # Temporal Reducer
//!
//! Pure functions that collapse the time axis of one variable into per-cell
//! summaries. Missing cells follow the source convention: NaN samples are
//! skipped, cells missing at every time step stay NaN.
//!
//! The annual-range reduction follows the Bio-Oracle definition used for
//! species-distribution covariates: per calendar year `|max - min|`, then
//! the mean of the per-year ranges. This is not the same quantity as a
//! single max-minus-min over the whole series.

use crate::dataset::{DataArray, TIME_DIM};
use crate::error::{ProcessError, Result};
use chrono::{DateTime, Datelike};
use log::warn;
use ndarray::{ArrayD, Axis, Zip};
use std::collections::BTreeMap;

/// Per-cell maximum across all time samples. Spatial (and depth, if
/// present) axes are left intact.
pub fn reduce_max(array: &DataArray) -> Result<DataArray> {
    collapse_time(array, f64::max)
}

/// Per-cell minimum across all time samples.
pub fn reduce_min(array: &DataArray) -> Result<DataArray> {
    collapse_time(array, f64::min)
}

/// Per-cell mean of the per-calendar-year `|max - min|` ranges.
///
/// Caveat: there is no minimum-samples-per-year threshold. A year covered by
/// a single sample contributes a zero range to the cross-year mean, and a
/// partial year contributes whatever samples fall in it. This matches the
/// calibration data downstream and is intentionally not "fixed" here.
pub fn reduce_annual_range(array: &DataArray) -> Result<DataArray> {
    let axis = time_axis(array)?;
    let times = array
        .coord(TIME_DIM)
        .ok_or_else(|| no_time(&array.name))?;

    let mut years: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &t) in times.iter().enumerate() {
        match DateTime::from_timestamp(t as i64, 0) {
            Some(instant) => years.entry(instant.year()).or_default().push(i),
            None => warn!(
                "variable '{}': time sample {} out of range, skipped",
                array.name, t
            ),
        }
    }

    let template = array.values.map_axis(Axis(axis), |_| 0.0);
    let mut sum = ArrayD::<f64>::zeros(template.raw_dim());
    let mut count = ArrayD::<f64>::zeros(template.raw_dim());
    for indices in years.values() {
        let year_view = array.values.select(Axis(axis), indices);
        let max = year_view.map_axis(Axis(axis), |lane| {
            lane.iter().fold(f64::NAN, |acc, &v| f64::max(acc, v))
        });
        let min = year_view.map_axis(Axis(axis), |lane| {
            lane.iter().fold(f64::NAN, |acc, &v| f64::min(acc, v))
        });
        let range = (max - min).mapv(f64::abs);
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&range)
            .for_each(|s, c, &r| {
                if r.is_finite() {
                    *s += r;
                    *c += 1.0;
                }
            });
    }

    let values = Zip::from(&sum)
        .and(&count)
        .map_collect(|&s, &c| if c > 0.0 { s / c } else { f64::NAN });

    Ok(collapsed(array, values))
}

fn collapse_time(array: &DataArray, combine: fn(f64, f64) -> f64) -> Result<DataArray> {
    let axis = time_axis(array)?;
    let values = array.values.map_axis(Axis(axis), |lane| {
        lane.iter().fold(f64::NAN, |acc, &v| combine(acc, v))
    });
    Ok(collapsed(array, values))
}

fn collapsed(array: &DataArray, values: ArrayD<f64>) -> DataArray {
    let mut coords = array.coords.clone();
    coords.remove(TIME_DIM);
    DataArray {
        name: array.name.clone(),
        dims: array
            .dims
            .iter()
            .filter(|d| *d != TIME_DIM)
            .cloned()
            .collect(),
        coords,
        values,
        epsg: array.epsg,
    }
}

fn time_axis(array: &DataArray) -> Result<usize> {
    array.axis(TIME_DIM).ok_or_else(|| no_time(&array.name))
}

fn no_time(name: &str) -> ProcessError {
    ProcessError::ShapeMismatch(format!("variable '{name}' has no time dimension"))
}
