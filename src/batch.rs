//! # Batch Orchestrator
//!
//! Walks the input directory tree, treats every folder holding `.nc` files
//! as one batch, and applies the operation plan to the merged dataset of
//! each batch. Output rasters mirror the input hierarchy under the output
//! root.
//!
//! Failure policy is best-effort completion with a diagnostic trail: a
//! per-file load failure excludes that file, a per-plan-entry failure is
//! logged and the next entry runs, a per-batch failure is logged and the
//! next batch runs. There is no global abort path.

use crate::dataset::{DataArray, GridDataset};
use crate::derive::{compute_magnitude, MAGNITUDE_VAR};
use crate::error::{ProcessError, Result};
use crate::export::export_geotiff;
use crate::grid::infer_cell_size;
use crate::input::{JobConfig, Operation, PlanEntry};
use crate::reduce::{reduce_annual_range, reduce_max, reduce_min};
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Totals of one processing run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub batches_attempted: usize,
    pub batches_failed: usize,
    pub rasters: Vec<PathBuf>,
    pub entries_failed: usize,
    pub files_skipped: usize,
}

impl RunSummary {
    pub fn absorb(&mut self, outcome: BatchOutcome) {
        self.rasters.extend(outcome.rasters);
        self.entries_failed += outcome.entries_failed;
        self.files_skipped += outcome.files_skipped;
    }
}

/// Result of one batch. Partial success is expected and normal.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rasters: Vec<PathBuf>,
    pub entries_failed: usize,
    pub files_skipped: usize,
}

/// Finds every directory under `input_root` that directly contains at least
/// one `.nc` file, in a stable order.
pub fn discover_batches(input_root: &Path) -> Result<Vec<PathBuf>> {
    let mut batches = Vec::new();
    for entry in WalkDir::new(input_root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() && has_netcdf_files(entry.path())? {
            batches.push(entry.path().to_path_buf());
        }
    }
    Ok(batches)
}

fn has_netcdf_files(dir: &Path) -> Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_netcdf(&entry.path()) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_netcdf(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("nc"))
}

/// Mirrored output directory for a batch.
pub fn batch_output_dir(config: &JobConfig, batch_dir: &Path) -> PathBuf {
    match batch_dir.strip_prefix(&config.input_root) {
        Ok(relative) => config.output_root.join(relative),
        Err(_) => config.output_root.clone(),
    }
}

/// Processes every batch under the configured input root.
pub fn process_tree(config: &JobConfig) -> Result<RunSummary> {
    process_tree_with_bar(config, &ProgressBar::hidden())
}

/// [`process_tree`] driving a progress bar: the bar's length is set to the
/// batch count, one tick per batch with the batch directory as message.
pub fn process_tree_with_bar(config: &JobConfig, bar: &ProgressBar) -> Result<RunSummary> {
    let batches = discover_batches(&config.input_root)?;
    info!(
        "found {} batch folder(s) under {}",
        batches.len(),
        config.input_root.display()
    );
    if batches.is_empty() {
        warn!("no batch folders under {}", config.input_root.display());
    }
    bar.set_length(batches.len() as u64);
    let mut summary = RunSummary::default();
    for batch_dir in &batches {
        bar.set_message(batch_dir.display().to_string());
        summary.batches_attempted += 1;
        match process_batch(batch_dir, &batch_output_dir(config, batch_dir), config) {
            Ok(outcome) => summary.absorb(outcome),
            Err(e) => {
                summary.batches_failed += 1;
                error!("batch {} failed: {e}", batch_dir.display());
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(summary)
}

/// Loads and merges the files of one batch, then runs every plan entry
/// independently against the merged dataset.
///
/// All per-batch state lives in this call frame and is dropped on return,
/// successful or not.
pub fn process_batch(
    batch_dir: &Path,
    output_dir: &Path,
    config: &JobConfig,
) -> Result<BatchOutcome> {
    let mut files: Vec<PathBuf> = fs::read_dir(batch_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| is_netcdf(p))
        .collect();
    files.sort();

    let mut dataset: Option<GridDataset> = None;
    let mut files_skipped = 0;
    for path in &files {
        match GridDataset::from_netcdf(path) {
            Ok(loaded) => match dataset.as_mut() {
                None => dataset = Some(loaded),
                Some(merged) => {
                    if let Err(e) = merged.merge(loaded) {
                        warn!("excluding {} from merge: {e}", path.display());
                        files_skipped += 1;
                    }
                }
            },
            Err(e) => {
                warn!("excluding unreadable file {}: {e}", path.display());
                files_skipped += 1;
            }
        }
    }
    let mut dataset = dataset.ok_or_else(|| ProcessError::BatchLoadFailure(batch_dir.to_path_buf()))?;
    debug!(
        "batch {}: merged variables {:?}",
        batch_dir.display(),
        dataset.variable_names()
    );

    let mut outcome = BatchOutcome {
        files_skipped,
        ..BatchOutcome::default()
    };
    for entry in &config.plan {
        match run_plan_entry(&mut dataset, entry, output_dir, config) {
            Ok(mut written) => outcome.rasters.append(&mut written),
            Err(e) => {
                outcome.entries_failed += 1;
                error!(
                    "batch {}: plan entry '{}' ({}) failed: {e}",
                    batch_dir.display(),
                    entry.subject(),
                    entry.kind()
                );
            }
        }
    }
    Ok(outcome)
}

fn run_plan_entry(
    dataset: &mut GridDataset,
    entry: &PlanEntry,
    output_dir: &Path,
    config: &JobConfig,
) -> Result<Vec<PathBuf>> {
    let code = match entry {
        PlanEntry::Direct { variable, .. } => variable.clone(),
        PlanEntry::Derived { components, .. } => {
            compute_magnitude(dataset, &components[0], &components[1])?;
            MAGNITUDE_VAR.to_string()
        }
    };

    let mut written = Vec::new();
    for &op in entry.operations() {
        let array = dataset.variable(&code)?;
        let reduced = match op {
            Operation::Max => reduce_max(array)?,
            Operation::Min => reduce_min(array)?,
            Operation::Range => reduce_annual_range(array)?,
        };
        let stem = output_stem(&code, op, &reduced, config);
        let path = export_geotiff(&reduced, &stem, output_dir, &config.export)?;
        info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// `{display}_{operation}`, with an optional cell-size/EPSG qualifier.
fn output_stem(code: &str, op: Operation, reduced: &DataArray, config: &JobConfig) -> String {
    let display = config.display_name(code);
    let mut stem = format!("{display}_{}", op.as_str());
    if config.export.qualified_names {
        match infer_cell_size(reduced) {
            Ok(cell) => {
                let epsg = reduced.epsg.unwrap_or(config.export.epsg);
                stem = format!("{stem}_{cell:.3}deg_epsg{epsg}");
            }
            Err(e) => debug!("cell-size label omitted for '{stem}': {e}"),
        }
    }
    stem
}
