//! CSV report of underutilized commitments.
//!
//! One file per run, named after the run date:
//! ```text
//! {output_dir}/ri_sp_report_{YYYYMMDD}.csv
//! ```
//! The header row is always written, so a run without findings still
//! produces a valid (empty) report. Utilization is written at full precision
//! so a report parses back to exactly the findings that produced it. Only
//! display paths round it.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::error::ReportError;
use crate::types::Finding;

/// Fixed column order of the report.
pub const REPORT_HEADER: [&str; 5] = ["type", "name", "utilization", "scope", "recommendation"];

/// Findings of one run, in report order.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn new(mut findings: Vec<Finding>, generated_at: DateTime<Utc>) -> Self {
        findings.sort_by(compare_findings);
        Self {
            generated_at,
            findings,
        }
    }
}

/// Report order: type, name, scope, then utilization.
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.scope.cmp(&b.scope))
        .then_with(|| a.utilization.total_cmp(&b.utilization))
}

/// Deterministic report file name for a run date.
pub fn report_file_name(as_of: NaiveDate) -> String {
    format!("ri_sp_report_{}.csv", as_of.format("%Y%m%d"))
}

/// Percentage rounded to two decimals for display, without trailing zeros (`45`, `45.5`).
pub fn format_utilization(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{}", rounded)
}

/// Writes reports into a configured output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Where the report for `as_of` is written.
    pub fn path_for(&self, as_of: NaiveDate) -> PathBuf {
        self.output_dir.join(report_file_name(as_of))
    }

    /// Write `report`, named after its generation date.
    pub async fn write(&self, report: &Report) -> Result<PathBuf, ReportError> {
        self.write_report(&report.findings, report.generated_at.date_naive())
            .await
    }

    /// Serialize `findings` to the dated report file and return its path.
    ///
    /// The file is written next to its final name and renamed into place,
    /// so readers never observe a partial report.
    pub async fn write_report(
        &self,
        findings: &[Finding],
        as_of: NaiveDate,
    ) -> Result<PathBuf, ReportError> {
        let path = self.path_for(as_of);
        let content = render_csv(findings)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let staging = path.with_extension("csv.partial");
        tokio::fs::write(&staging, &content).await?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            tokio::fs::remove_file(&staging).await.ok();
            return Err(e.into());
        }

        info!(path = %path.display(), findings = findings.len(), "report written");
        Ok(path)
    }
}

/// Render findings as CSV, header first, in report order.
pub fn render_csv(findings: &[Finding]) -> Result<Vec<u8>, ReportError> {
    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| compare_findings(a, b));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADER)?;

    for finding in sorted {
        let utilization = finding.utilization.to_string();
        writer.write_record([
            finding.kind.label(),
            finding.name.as_str(),
            utilization.as_str(),
            finding.scope.as_str(),
            finding.recommendation.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| ReportError::Io(e.into_error()))
}

/// Parse a report file back into findings.
pub fn read_report(path: &Path) -> Result<Vec<Finding>, ReportError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.iter().ne(REPORT_HEADER) {
        return Err(ReportError::InvalidRow {
            row: 0,
            message: format!("unexpected header: {}", headers.iter().collect::<Vec<_>>().join(",")),
        });
    }

    let mut findings = Vec::new();
    for (index, row) in reader.deserialize::<Finding>().enumerate() {
        let finding = row.map_err(|e| ReportError::InvalidRow {
            row: index + 1,
            message: e.to_string(),
        })?;
        findings.push(finding);
    }

    Ok(findings)
}
