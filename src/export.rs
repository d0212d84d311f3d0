//! # Raster Exporter
//!
//! Converts a time-collapsed [`DataArray`] into a single-band GeoTIFF.
//!
//! ## Behaviour
//!
//! - A leftover singleton time axis is dropped by selection (not reduction);
//!   more than one remaining sample is an input-contract violation and only
//!   the first sample is written, with a warning.
//! - Singleton non-spatial axes (the length-1 `depth` of provider subsets)
//!   are squeezed the same way.
//! - The array is oriented (y, x) and flipped north-up before writing.
//! - The raster is georeferenced with raw GeoTIFF tags: pixel scale,
//!   tiepoint, geo-key directory, and the GDAL nodata string.
//! - The source file's CRS always wins; the policy EPSG is a fallback for
//!   sources carrying none, never an override.

use crate::dataset::{DataArray, TIME_DIM};
use crate::error::{ProcessError, Result};
use crate::grid::resolve_spatial_dims;
use crate::input::{Codec, ExportPolicy, OutputDtype};
use log::{debug, warn};
use ndarray::Ix2;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::encoder::colortype::{ColorType, Gray32Float, Gray64Float};
use tiff::encoder::compression::{Compression, Deflate, Lzw, Uncompressed};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey ids used in the directory.
const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Georeferencing tags written alongside the band.
struct GeoTags {
    pixel_scale: [f64; 3],
    tiepoint: [f64; 6],
    geo_keys: Vec<u16>,
    nodata: String,
}

/// Writes `array` as `{display_name}.tif` under `output_dir` and returns
/// the written path.
pub fn export_geotiff(
    array: &DataArray,
    display_name: &str,
    output_dir: &Path,
    policy: &ExportPolicy,
) -> Result<PathBuf> {
    let mut work = array.clone();

    // Cardinality assertion, not a reduction: a reduced array may still
    // carry a singleton time axis.
    if let Some(axis) = work.axis(TIME_DIM) {
        let samples = work.values.shape()[axis];
        if samples == 0 {
            return Err(ProcessError::ShapeMismatch(format!(
                "'{}' has an empty time axis",
                work.name
            )));
        }
        if samples > 1 {
            warn!(
                "'{}': {} time samples remain at export, taking the first",
                work.name, samples
            );
        }
        work = work.select_index(axis, 0);
    }

    let (x_dim, y_dim) = resolve_spatial_dims(&work)?;

    while let Some(axis) = work
        .dims
        .iter()
        .position(|d| *d != x_dim && *d != y_dim)
    {
        let len = work.values.shape()[axis];
        if len != 1 {
            return Err(ProcessError::ShapeMismatch(format!(
                "'{}': dimension '{}' of length {} cannot be rasterized",
                work.name, work.dims[axis], len
            )));
        }
        work = work.select_index(axis, 0);
    }

    let grid = work
        .values
        .clone()
        .into_dimensionality::<Ix2>()
        .map_err(|e| ProcessError::ShapeMismatch(e.to_string()))?;
    // Canonical (y, x) axis order.
    let grid = if work.dims[0] == y_dim {
        grid
    } else {
        grid.reversed_axes()
    };
    let (height, width) = grid.dim();

    let xs: Vec<f64> = work
        .coord(&x_dim)
        .map(<[f64]>::to_vec)
        .unwrap_or_else(|| (0..width).map(|i| i as f64).collect());
    let ys: Vec<f64> = work
        .coord(&y_dim)
        .map(<[f64]>::to_vec)
        .unwrap_or_else(|| (0..height).map(|i| i as f64).collect());

    let res_x = coord_step(&xs).unwrap_or_else(|| {
        warn!("'{}': single-column raster, assuming unit cell size", work.name);
        1.0
    });
    let res_y = coord_step(&ys).unwrap_or_else(|| {
        warn!("'{}': single-row raster, assuming unit cell size", work.name);
        1.0
    });

    // Pixel-is-area: the tiepoint anchors the outer corner of cell (0, 0).
    let west = xs.iter().copied().fold(f64::INFINITY, f64::min) - res_x / 2.0;
    let north = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max) + res_y / 2.0;

    // Fallback, not override: an EPSG carried by the source wins.
    let epsg = work.epsg.unwrap_or(policy.epsg);
    let tags = GeoTags {
        pixel_scale: [res_x, res_y, 0.0],
        tiepoint: [0.0, 0.0, 0.0, west, north, 0.0],
        geo_keys: geo_key_directory(epsg)?,
        nodata: format!("{}", policy.nodata),
    };

    // North-up row order.
    let flip = ys.len() >= 2 && ys[0] < ys[ys.len() - 1];
    let mut pixels = Vec::with_capacity(height * width);
    for row in 0..height {
        let src = if flip { height - 1 - row } else { row };
        for col in 0..width {
            let v = grid[[src, col]];
            pixels.push(if v.is_finite() { v } else { policy.nodata });
        }
    }

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{display_name}.tif"));
    let file = BufWriter::new(File::create(&path)?);
    let mut encoder = TiffEncoder::new(file)?;
    let (w, h) = (width as u32, height as u32);

    match policy.dtype {
        OutputDtype::Float32 => {
            let data: Vec<f32> = pixels.iter().map(|&v| v as f32).collect();
            match policy.compression {
                Codec::None => {
                    write_band::<_, Gray32Float, _>(&mut encoder, w, h, Uncompressed::default(), &tags, &data)?
                }
                Codec::Deflate => {
                    write_band::<_, Gray32Float, _>(&mut encoder, w, h, Deflate::default(), &tags, &data)?
                }
                Codec::Lzw => {
                    write_band::<_, Gray32Float, _>(&mut encoder, w, h, Lzw::default(), &tags, &data)?
                }
            }
        }
        OutputDtype::Float64 => match policy.compression {
            Codec::None => {
                write_band::<_, Gray64Float, _>(&mut encoder, w, h, Uncompressed::default(), &tags, &pixels)?
            }
            Codec::Deflate => {
                write_band::<_, Gray64Float, _>(&mut encoder, w, h, Deflate::default(), &tags, &pixels)?
            }
            Codec::Lzw => {
                write_band::<_, Gray64Float, _>(&mut encoder, w, h, Lzw::default(), &tags, &pixels)?
            }
        },
    }

    debug!("wrote {}x{} raster to {}", width, height, path.display());
    Ok(path)
}

fn coord_step(coords: &[f64]) -> Option<f64> {
    if coords.len() < 2 {
        None
    } else {
        Some((coords[1] - coords[0]).abs())
    }
}

/// Builds the GeoKey directory for an EPSG code. Geographic codes are
/// written as a geographic model, everything else as projected.
fn geo_key_directory(epsg: u32) -> Result<Vec<u16>> {
    let code = u16::try_from(epsg).map_err(|_| {
        ProcessError::CrsWriteFailure(format!("EPSG:{epsg} does not fit in a GeoTIFF key entry"))
    })?;
    if code == 0 {
        return Err(ProcessError::CrsWriteFailure(
            "no usable EPSG code (source carries none and no fallback configured)".to_string(),
        ));
    }
    let geographic = matches!(code, 4326 | 4258 | 4269);
    let (model, cs_key) = if geographic {
        (2u16, KEY_GEOGRAPHIC_TYPE)
    } else {
        (1u16, KEY_PROJECTED_CS_TYPE)
    };
    Ok(vec![
        1, 1, 0, 3, // directory header: version, revision, minor, key count
        KEY_MODEL_TYPE, 0, 1, model,
        KEY_RASTER_TYPE, 0, 1, 1, // PixelIsArea
        cs_key, 0, 1, code,
    ])
}

fn write_band<W, C, D>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    compression: D,
    tags: &GeoTags,
    data: &[C::Inner],
) -> std::result::Result<(), tiff::TiffError>
where
    W: Write + Seek,
    C: ColorType,
    D: Compression,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image_with_compression::<C, D>(width, height, compression)?;
    let dir = image.encoder();
    dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &tags.pixel_scale[..])?;
    dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tags.tiepoint[..])?;
    dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &tags.geo_keys[..])?;
    dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), tags.nodata.as_str())?;
    image.write_data(data)
}
