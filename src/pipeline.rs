//! The end-to-end run: load, normalize, aggregate, write.

use crate::analysis::{build_reports, normalize, Capabilities, ReportContext, ReportOutput};
use crate::config::Config;
use crate::loader::load_year_sheets;
use crate::models::{Artifact, ArtifactKind};
use crate::report::{write_aggregate, write_manifest, write_table, ChartRenderer, Manifest, OutputDir};
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, info};

/// CSV name of the unified table.
pub const COMBINED_TABLE: &str = "combined_all_years";

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub manifest: Manifest,
    /// Where the manifest was written, when enabled.
    pub manifest_path: Option<PathBuf>,
}

/// Run every stage against `config`, writing into `out`.
///
/// Loading errors abort before any file is written.
pub fn run(config: &Config, out: &OutputDir, show_progress: bool) -> Result<RunSummary> {
    let columns = &config.columns;

    let loaded = load_year_sheets(&config.input.excel, &config.input.sheet_prefix, &columns.year)
        .context("Failed to load workbook")?;
    let rows_loaded = loaded.total_rows();
    let sheets = loaded.sheets;

    let normalized = normalize(loaded.table, columns).context("Failed to normalize data")?;
    let table = normalized.table;
    info!(
        "Retained {} of {} rows ({} without '{}')",
        table.len(),
        rows_loaded,
        normalized.dropped,
        columns.volume
    );

    let mut artifacts = Vec::new();

    write_table(out, COMBINED_TABLE, &table)?;
    artifacts.push(Artifact {
        report: "base".to_string(),
        kind: ArtifactKind::Table,
        file: format!("{}.csv", COMBINED_TABLE),
        rows: Some(table.len()),
    });

    let caps = Capabilities::detect(&table, columns);
    debug!("Detected columns: {:?}", caps);

    let ctx = ReportContext {
        table: &table,
        columns,
        limits: &config.reports,
    };
    let reports = build_reports(&ctx, &caps);

    let renderer = config
        .output
        .charts
        .then(|| ChartRenderer::new(&config.charts));

    let progress = progress_bar(reports.len() as u64, show_progress)?;
    for report in &reports {
        progress.set_message(format!("report {}", report.id));
        write_report(out, report, renderer.as_ref(), &mut artifacts)?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    let manifest = Manifest {
        generated_at: Utc::now(),
        input: config.input.excel.clone(),
        sheets,
        columns: caps,
        rows_loaded,
        rows_retained: table.len(),
        rows_dropped: normalized.dropped,
        artifacts,
    };

    let manifest_path = if config.output.manifest {
        Some(write_manifest(out, &manifest)?)
    } else {
        None
    };

    Ok(RunSummary {
        manifest,
        manifest_path,
    })
}

/// Write one report's tables, then its charts.
fn write_report(
    out: &OutputDir,
    report: &ReportOutput,
    renderer: Option<&ChartRenderer>,
    artifacts: &mut Vec<Artifact>,
) -> Result<()> {
    for named in &report.tables {
        write_aggregate(out, &named.name, &named.table)?;
        artifacts.push(Artifact {
            report: report.id.to_string(),
            kind: ArtifactKind::Table,
            file: format!("{}.csv", named.name),
            rows: Some(named.table.len()),
        });
    }

    let Some(renderer) = renderer else {
        return Ok(());
    };

    for spec in &report.charts {
        if renderer.render(out, spec)?.is_some() {
            artifacts.push(Artifact {
                report: report.id.to_string(),
                kind: ArtifactKind::Chart,
                file: spec.file.clone(),
                rows: None,
            });
        }
    }

    Ok(())
}

fn progress_bar(len: u64, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
