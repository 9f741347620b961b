//! The `latest_run.json` report.
//!
//! Written at the end of every run, whatever the outcome, so the calling
//! process (cron wrapper, social poster) can see what happened without
//! parsing logs.

use crate::models::{RunReport, RunStatus};
use chrono::{NaiveDate, Utc};
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Assemble a report for the run that just finished.
pub fn build_report(
    date: NaiveDate,
    slug: &str,
    headline: &str,
    status: RunStatus,
    names: Vec<String>,
    surfaces: Vec<String>,
) -> RunReport {
    RunReport {
        date: date.to_string(),
        slug: slug.to_string(),
        headline: headline.to_string(),
        status,
        names,
        surfaces,
        generated_at: Utc::now().to_rfc3339(),
    }
}

/// Whether `report` already describes this date's run. A skipped re-run
/// must not overwrite the report the real run wrote earlier the same day.
pub fn report_covers(report: &RunReport, date: NaiveDate) -> bool {
    report.date == date.to_string()
}

/// Serialize the report into `{site_root}/latest_run.json`.
#[instrument(level = "info", skip_all, fields(status = ?report.status, slug = %report.slug))]
pub async fn write_report(report: &RunReport, site_root: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = format!("{}/latest_run.json", site_root.trim_end_matches('/'));
    fs::write(&path, json).await?;
    info!(%path, "Wrote run report");
    Ok(())
}

/// Read back the most recent report, if any.
pub async fn read_report(site_root: &str) -> Result<RunReport, Box<dyn Error>> {
    let path = format!("{}/latest_run.json", site_root.trim_end_matches('/'));
    let raw = fs::read_to_string(&path).await?;
    Ok(serde_json::from_str(&raw)?)
}
