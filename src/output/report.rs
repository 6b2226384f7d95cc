//! JSON report file

use crate::{
    error::{ErrorContext, Result},
    harness::RunReport,
};
use std::path::{Path, PathBuf};

/// Writes a [`RunReport`] as pretty-printed JSON
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the report, creating parent directories as needed
    pub async fn write(&self, report: &RunReport) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write report {}", self.path.display()))
    }

    /// Read a previously written report
    pub async fn read(path: impl AsRef<Path>) -> Result<RunReport> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }
}
