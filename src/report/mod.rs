//! Output generation.
//!
//! This module owns the output directory and writes the CSV tables,
//! chart images and the run manifest into it.

pub mod charts;
pub mod manifest;
pub mod tables;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use charts::ChartRenderer;
pub use manifest::{write_manifest, Manifest};
pub use tables::{write_aggregate, write_table};

/// The directory receiving every generated file.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Create the directory (and parents) if needed.
    pub fn init(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create output directory: {}", root.display()))?;
        debug!("Output directory ready: {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("a").join("outputs");

        let out = OutputDir::init(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(out.file("x.csv"), root.join("x.csv"));

        // Second init on an existing directory is fine
        assert!(OutputDir::init(&root).is_ok());
    }
}
