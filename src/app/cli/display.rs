//! Terminal presentation of progress and results

use prettytable::{format, Cell, Row, Table};

use crate::core::styles::StyleRole;
use crate::scanner::events::{MessageLevel, ProgressEvent, ProgressSink};
use crate::scanner::types::{Finding, ScanSummary};
use crate::scanner::workflow::ScanOutcome;

pub const REPORT_HEADING: &str = "Detailed Bandit Report";

/// Prints progress lines to stderr as they arrive
#[derive(Debug, Clone, Copy)]
pub struct TerminalProgress {
    color: bool,
}

impl TerminalProgress {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl ProgressSink for TerminalProgress {
    fn notify(&self, event: &ProgressEvent) {
        if let ProgressEvent::StateChanged(state) = event {
            log::debug!("Workflow state: {}", state);
        }
        if let Some(message) = event.message() {
            eprintln!("{}", status_line(message.level, &message.text, self.color));
        }
    }
}

pub fn status_line(level: MessageLevel, text: &str, color: bool) -> String {
    let tag = match level {
        MessageLevel::Info => "info",
        MessageLevel::Warning => "warning",
        MessageLevel::Success => "done",
        MessageLevel::Error => "error",
    };
    format!("{} {}", StyleRole::from(level).paint(&format!("[{}]", tag), color), text)
}

fn cell(text: &str, role: StyleRole, color: bool) -> Cell {
    let cell = Cell::new(text);
    match role.to_prettytable_spec() {
        Some(spec) if color => cell.style_spec(spec),
        _ => cell,
    }
}

/// Two-column table with the labelled metrics
pub fn metrics_table(summary: &ScanSummary, color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);

    let mut add = |label: &str, value: String| {
        table.add_row(Row::new(vec![
            cell(label, StyleRole::Key, color),
            cell(&value, StyleRole::Value, color),
        ]));
    };
    add("Total Issues", summary.total_issues.to_string());
    add("Execution Time", summary.execution_time.to_string());

    let severity = &summary.severity;
    if severity.total() > 0 {
        add("High", severity.high.to_string());
        add("Medium", severity.medium.to_string());
        add("Low", severity.low.to_string());
        if severity.undefined > 0 {
            add("Undefined", severity.undefined.to_string());
        }
    }
    table
}

pub fn findings_table(findings: &[Finding], color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        ["Test", "Severity", "Confidence", "Location", "Issue"]
            .iter()
            .map(|title| cell(title, StyleRole::Header, color))
            .collect(),
    ));
    for finding in findings {
        let severity_role = match finding.severity.to_ascii_uppercase().as_str() {
            "HIGH" => StyleRole::Error,
            "MEDIUM" => StyleRole::Warning,
            _ => StyleRole::Value,
        };
        table.add_row(Row::new(vec![
            Cell::new(&format!("{} {}", finding.test_id, finding.test_name)),
            cell(&finding.severity, severity_role, color),
            Cell::new(&finding.confidence),
            Cell::new(&format!("{}:{}", finding.filename, finding.line_number)),
            Cell::new(&finding.text),
        ]));
    }
    table
}

/// Full stdout rendering of a finished run
pub fn render_outcome(outcome: &ScanOutcome, show_report: bool, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&StyleRole::Header.paint(&format!("Scan of {}", outcome.url), color));
    out.push('\n');
    out.push_str(&metrics_table(&outcome.summary, color).to_string());

    if !outcome.findings.is_empty() {
        out.push('\n');
        out.push_str(&findings_table(&outcome.findings, color).to_string());
    }

    if show_report {
        out.push('\n');
        out.push_str(&StyleRole::Header.paint(REPORT_HEADING, color));
        out.push('\n');
        if outcome.report.is_empty() {
            out.push_str(&StyleRole::Dim.paint("(no report produced)", color));
            out.push('\n');
        } else {
            out.push_str(&outcome.report);
            if !outcome.report.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}
