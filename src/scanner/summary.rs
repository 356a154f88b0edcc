//! Report Summarizer
//!
//! Turns the scanner's report file into a `ScanSummary`. The text format is
//! summarized by counting the literal `Issue:` label, the JSON format by
//! reading its `results` array.

use std::io;
use std::path::Path;

use serde::Deserialize;

use super::error::{SummaryError, SummaryResult};
use super::types::{
    ExecutionTime, Finding, ReportFormat, ScanSummary, SeverityCounts, SummarizedReport,
};

/// Label that starts every issue record in the text report
pub const ISSUE_LABEL: &str = "Issue:";

const SEVERITY_LABEL: &str = "Severity:";

/// Number of non-overlapping `Issue:` occurrences in `report`
pub fn count_issues(report: &str) -> usize {
    report.matches(ISSUE_LABEL).count()
}

/// Severity counts from the `Severity: <level>` line under each text issue
pub fn severity_from_text(report: &str) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for line in report.lines() {
        if let Some(rest) = line.trim_start().strip_prefix(SEVERITY_LABEL) {
            if let Some(level) = rest.split_whitespace().next() {
                counts.record(level);
            }
        }
    }
    counts
}

#[derive(Debug, Deserialize)]
struct JsonReport {
    #[serde(default)]
    results: Vec<Finding>,
}

/// Summarize the report at `path`.
///
/// A missing report yields zero issues, `N/A` and empty text. Execution
/// time is always `N/A` here; the caller fills in the measured duration.
pub fn summarize(path: &Path, format: ReportFormat) -> SummaryResult<SummarizedReport> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No report at {}", path.display());
            return Ok(SummarizedReport {
                summary: ScanSummary::not_available(),
                findings: Vec::new(),
                text: String::new(),
            });
        }
        Err(source) => {
            return Err(SummaryError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let (total_issues, severity, findings) = match format {
        ReportFormat::Text => (count_issues(&text), severity_from_text(&text), Vec::new()),
        ReportFormat::Json => {
            let report: JsonReport =
                serde_json::from_str(&text).map_err(|source| SummaryError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            let mut severity = SeverityCounts::default();
            for finding in &report.results {
                severity.record(&finding.severity);
            }
            (report.results.len(), severity, report.results)
        }
    };

    log::info!(
        "Report {} lists {} issue(s)",
        path.display(),
        total_issues
    );

    Ok(SummarizedReport {
        summary: ScanSummary {
            total_issues,
            execution_time: ExecutionTime::NotAvailable,
            severity,
        },
        findings,
        text,
    })
}
