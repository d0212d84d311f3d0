use crate::batch::RunSummary;
use crate::error::Result;
use crate::input::JobConfig;
use std::path::Path;
use std::time::Duration;

pub fn show_greeting(config_path: &Path) {
    println!("=== NetCDF to GeoTIFF climatology converter ===");
    println!("Loading configuration from: {}", config_path.display());
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Input root: {}", config.input_root.display());
    println!("  Output root: {}", config.output_root.display());
    println!("  Fallback EPSG: {}", config.export.epsg);
    println!("  Nodata: {}", config.export.nodata);
    println!("  Plan entries: {}", config.plan.len());

    for (i, entry) in config.plan.iter().enumerate() {
        let ops: Vec<&str> = entry.operations().iter().map(|o| o.as_str()).collect();
        println!(
            "    Entry {}: {} '{}' -> [{}]",
            i + 1,
            entry.kind(),
            entry.subject(),
            ops.join(", ")
        );
    }
}

pub fn show_netcdf_file_info(path: &Path, detailed: bool) -> Result<()> {
    let file = netcdf::open(path)?;
    println!("NetCDF File Info: {}", path.display());
    println!("Dimensions:");
    for dim in file.dimensions() {
        println!("  {}: {}", dim.name(), dim.len());
    }
    println!("Variables:");
    for var in file.variables() {
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        println!("  {}: {:?}", var.name(), dims);
        if detailed {
            for attr in var.attributes() {
                if let Ok(value) = attr.value() {
                    println!("    {} = {:?}", attr.name(), value);
                }
            }
        }
    }
    if detailed {
        println!("Global attributes:");
        for attr in file.attributes() {
            if let Ok(value) = attr.value() {
                println!("  {} = {:?}", attr.name(), value);
            }
        }
    }
    Ok(())
}

pub fn show_farewell_with_timing(summary: &RunSummary, elapsed: Duration) {
    println!("\n=== Run complete in {:.2}s ===", elapsed.as_secs_f64());
    println!(
        "  Batches: {} attempted, {} failed",
        summary.batches_attempted, summary.batches_failed
    );
    println!("  Rasters written: {}", summary.rasters.len());
    println!("  Plan entries failed: {}", summary.entries_failed);
    println!("  Files skipped: {}", summary.files_skipped);
}
