//! Run manifest.
//!
//! `manifest.json` records what a run read and which files it wrote.

use super::OutputDir;
use crate::analysis::Capabilities;
use crate::loader::SheetInfo;
use crate::models::{Artifact, ArtifactKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    /// Workbook path as given.
    pub input: PathBuf,
    pub sheets: Vec<SheetInfo>,
    /// Optional columns found in the workbook.
    pub columns: Capabilities,
    /// Rows stacked from all year sheets.
    pub rows_loaded: usize,
    /// Rows left after dropping missing volumes.
    pub rows_retained: usize,
    pub rows_dropped: usize,
    /// Files in the order they were written.
    pub artifacts: Vec<Artifact>,
}

impl Manifest {
    pub fn tables(&self) -> usize {
        self.count(ArtifactKind::Table)
    }

    pub fn charts(&self) -> usize {
        self.count(ArtifactKind::Chart)
    }

    fn count(&self, kind: ArtifactKind) -> usize {
        self.artifacts.iter().filter(|a| a.kind == kind).count()
    }
}

/// Serialize `manifest` as pretty JSON into the output directory.
pub fn write_manifest(out: &OutputDir, manifest: &Manifest) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    let path = out.file(MANIFEST_FILE);
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
