//! Scanner data types shared by the runner, summarizer and front ends

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{Display, EnumString};

use crate::core::time::round_secs;

/// Report format requested from the scanner
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    /// Value passed to the scanner's `-f` flag
    pub fn scanner_flag(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        self.scanner_flag()
    }
}

/// Wall-clock duration of the scanner run, or `N/A` when nothing was measured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionTime {
    NotAvailable,
    Measured(Duration),
}

impl fmt::Display for ExecutionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTime::NotAvailable => write!(f, "N/A"),
            ExecutionTime::Measured(duration) => write!(f, "{:.2} sec", round_secs(*duration)),
        }
    }
}

impl Serialize for ExecutionTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Issue counts by scanner severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub undefined: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    /// Count one issue at `level` (case-insensitive, unknown levels are `undefined`)
    pub fn record(&mut self, level: &str) {
        match level.trim().to_ascii_lowercase().as_str() {
            "low" => self.low += 1,
            "medium" => self.medium += 1,
            "high" => self.high += 1,
            _ => self.undefined += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.undefined + self.low + self.medium + self.high
    }
}

/// One structured finding from a JSON report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub test_id: String,
    #[serde(default)]
    pub test_name: String,
    #[serde(rename = "issue_severity")]
    pub severity: String,
    #[serde(rename = "issue_confidence", default)]
    pub confidence: String,
    pub filename: String,
    #[serde(default)]
    pub line_number: u64,
    #[serde(rename = "issue_text")]
    pub text: String,
}

/// Headline numbers shown for a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub total_issues: usize,
    pub execution_time: ExecutionTime,
    pub severity: SeverityCounts,
}

impl ScanSummary {
    /// Summary used when the scanner left no report behind
    pub fn not_available() -> Self {
        Self {
            total_issues: 0,
            execution_time: ExecutionTime::NotAvailable,
            severity: SeverityCounts::default(),
        }
    }
}

/// Summary plus the raw report text it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizedReport {
    pub summary: ScanSummary,
    pub findings: Vec<Finding>,
    pub text: String,
}

/// Where one run keeps its working copy and report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPaths {
    pub clone_dir: PathBuf,
    pub report_path: PathBuf,
}
