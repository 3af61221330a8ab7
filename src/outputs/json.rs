//! JSON output of the aggregate report.
//!
//! The report is the contract with downstream consumers (the web UI reads
//! it), so it is written in full: the window, every agency's status and its
//! filtered items, and the run-level `fatal` marker.

use crate::models::AggregateReport;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `report` to `{dir}/report.json`, creating `dir` if needed.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_report(report: &AggregateReport, dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create report dir");
        return Err(e.into());
    }

    let path = dir.join("report.json");
    fs::write(&path, json).await?;
    info!(path = %path.display(), agencies = report.agencies.len(), items = report.total_items(), "Wrote JSON report");
    Ok(path)
}
