//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.coffee-exports.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".coffee-exports.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input workbook settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Output directory settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Source column names.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Report truncation settings.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Chart rendering settings.
    #[serde(default)]
    pub charts: ChartsConfig,
}

/// Input workbook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path to the workbook.
    #[serde(default = "default_excel")]
    pub excel: PathBuf,

    /// Sheets whose name starts with this prefix (case-insensitive) are loaded.
    #[serde(default = "default_sheet_prefix")]
    pub sheet_prefix: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            excel: default_excel(),
            sheet_prefix: default_sheet_prefix(),
        }
    }
}

fn default_excel() -> PathBuf {
    PathBuf::from("colombia_coffee_v1_0_3.xlsx")
}

fn default_sheet_prefix() -> String {
    "Year".to_string()
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving CSV tables and chart images.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Render chart images.
    #[serde(default = "default_true")]
    pub charts: bool,

    /// Write `manifest.json` listing the generated files.
    #[serde(default = "default_true")]
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            charts: true,
            manifest: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_true() -> bool {
    true
}

/// Names of the workbook columns the reports read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    /// Year label column, filled from the sheet name.
    pub year: String,
    /// Primary measure, kilograms.
    pub volume: String,
    /// Trade value.
    pub value: String,
    /// Derived measure, tons.
    pub volume_tons: String,
    pub destination: String,
    pub exporter: String,
    pub importer: String,
    pub bean: String,
    pub municipality: String,
    /// Columns coerced to numbers before aggregation, besides volume and value.
    pub numeric: Vec<String>,
    /// Header of the share-of-total column in summary tables.
    pub percentage: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            year: "Year".to_string(),
            volume: "Trade volume".to_string(),
            value: "Trade value".to_string(),
            volume_tons: "Trade volume (t)".to_string(),
            destination: "Country of destination".to_string(),
            exporter: "Exporter".to_string(),
            importer: "Importer".to_string(),
            bean: "Coffee bean".to_string(),
            municipality: "Municipality of export".to_string(),
            numeric: vec!["Trade volume".to_string(), "Trade value".to_string()],
            percentage: "Porcentaje".to_string(),
        }
    }
}

/// Top-N limits used by the reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Countries shown in the destination pie.
    pub pie_countries: usize,
    /// Exporters shown in the exporter bar chart.
    pub top_exporters: usize,
    /// Importers kept per year.
    pub importers_per_year: usize,
    /// Destination countries kept per year.
    pub countries_per_year: usize,
    /// Bean types kept per year.
    pub beans_per_year: usize,
    /// Municipalities shown in the municipality bar chart.
    pub top_municipalities: usize,
    /// Municipalities broken down by exporter.
    pub municipalities_with_exporters: usize,
    /// Exporters charted per municipality.
    pub exporters_per_municipality: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            pie_countries: 10,
            top_exporters: 10,
            importers_per_year: 3,
            countries_per_year: 3,
            beans_per_year: 1,
            top_municipalities: 10,
            municipalities_with_exporters: 5,
            exporters_per_municipality: 5,
        }
    }
}

/// Chart image geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Pixels per inch.
    pub dpi: u32,
    /// Bar chart size in inches (width, height).
    pub bar_size: (f64, f64),
    /// Pie chart size in inches (width, height).
    pub pie_size: (f64, f64),
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            bar_size: (10.0, 6.0),
            pie_size: (8.0, 8.0),
        }
    }
}

impl ChartsConfig {
    /// Bar chart size in pixels.
    pub fn bar_pixels(&self) -> (u32, u32) {
        to_pixels(self.bar_size, self.dpi)
    }

    /// Pie chart size in pixels.
    pub fn pie_pixels(&self) -> (u32, u32) {
        to_pixels(self.pie_size, self.dpi)
    }
}

fn to_pixels((w, h): (f64, f64), dpi: u32) -> (u32, u32) {
    let dpi = f64::from(dpi);
    ((w * dpi).round().max(1.0) as u32, (h * dpi).round().max(1.0) as u32)
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref excel) = args.excel {
            self.input.excel = excel.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.output.dir = dir.clone();
        }

        // Flags only ever switch features off
        if args.no_charts {
            self.output.charts = false;
        }
        if args.no_manifest {
            self.output.manifest = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
