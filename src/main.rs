use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use nc2tiff::batch::process_tree_with_bar;
use nc2tiff::cli::{init_logging, Cli, Commands, TemplateFormat};
use nc2tiff::input::JobConfig;
use nc2tiff::log as console;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Process {
            config,
            input_override,
            output_override,
        } => run_process(&config, input_override, output_override, cli.quiet),
        Commands::Info { file, detailed } => console::show_netcdf_file_info(&file, detailed)
            .with_context(|| format!("failed to inspect {}", file.display())),
        Commands::Template { format } => {
            let template = JobConfig::template();
            let rendered = match format {
                TemplateFormat::Json => serde_json::to_string_pretty(&template)?,
                TemplateFormat::Yaml => serde_yaml::to_string(&template)?,
            };
            println!("{rendered}");
            Ok(())
        }
    }
}

fn run_process(
    config_path: &Path,
    input_override: Option<PathBuf>,
    output_override: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    if !quiet {
        console::show_greeting(config_path);
    }

    let mut config = JobConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(input) = input_override {
        config.input_root = input;
    }
    if let Some(output) = output_override {
        config.output_root = output;
    }
    if !quiet {
        console::config_echo(&config);
    }

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let summary = process_tree_with_bar(&config, &bar)?;

    if !quiet {
        console::show_farewell_with_timing(&summary, start.elapsed());
    }
    Ok(())
}
