//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Coffee Exports Analysis - full report by trade volume
///
/// Reads every "Year ..." sheet of the export workbook and writes CSV
/// summaries and charts by year, destination country, exporter,
/// importer, coffee bean and municipality.
///
/// Examples:
///   coffee-exports
///   coffee-exports --excel data/colombia_coffee_v1_0_3.xlsx
///   coffee-exports --excel book.xlsx --output-dir reports --no-charts
///   coffee-exports --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the Excel workbook
    ///
    /// Defaults to colombia_coffee_v1_0_3.xlsx, or the `input.excel`
    /// setting of the config file.
    #[arg(long, value_name = "FILE", env = "COFFEE_EXCEL")]
    pub excel: Option<PathBuf>,

    /// Directory for CSV tables and chart images
    #[arg(short, long, value_name = "DIR", env = "COFFEE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .coffee-exports.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Skip chart images, write CSV tables only
    #[arg(long)]
    pub no_charts: bool,

    /// Do not write manifest.json
    #[arg(long)]
    pub no_manifest: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .coffee-exports.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref excel) = self.excel {
            if excel.as_os_str().is_empty() {
                return Err("--excel must not be empty".to_string());
            }
        }

        if let Some(ref dir) = self.output_dir {
            if dir.as_os_str().is_empty() {
                return Err("--output-dir must not be empty".to_string());
            }
            if dir.is_file() {
                return Err(format!("Output path is a file: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
