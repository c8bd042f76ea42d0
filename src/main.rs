//! Coffee Exports - trade volume reports for Colombian coffee exports
//!
//! A CLI tool that reads the per-year sheets of the export workbook and
//! writes CSV summaries and PNG charts by year, destination country,
//! exporter, importer, coffee bean and municipality.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Fatal error (unreadable workbook, no year sheets, write failure, etc.)

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod pipeline;
mod report;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use report::OutputDir;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Coffee Exports v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(&args) {
        error!("Run failed: {}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .coffee-exports.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change column names, top-N limits and chart sizes.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load the configuration, prepare the output directory and run the pipeline.
fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(args)?;
    config.merge_with_args(args);

    let out = OutputDir::init(&config.output.dir)?;
    info!("Writing outputs to {}", out.root().display());

    let summary = pipeline::run(&config, &out, !args.quiet)?;
    let manifest = &summary.manifest;

    if !args.quiet {
        println!("Sheets loaded: {}", manifest.sheets.len());
        println!(
            "Rows retained: {} of {} ({} dropped)",
            manifest.rows_retained, manifest.rows_loaded, manifest.rows_dropped
        );
        println!("Tables written: {}", manifest.tables());
        println!("Charts written: {}", manifest.charts());
        if let Some(ref path) = summary.manifest_path {
            println!("Manifest: {}", path.display());
        }
        println!("Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    }

    println!("Listo. Archivos generados en: {}", out.root().display());
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
