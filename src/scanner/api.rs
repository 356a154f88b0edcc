//! Scanner API
//!
//! Public surface of the scanner used by the terminal and web front ends.

pub use crate::scanner::acquire::{CloneBackend, GixCloneBackend, RepositoryAcquirer};
pub use crate::scanner::error::{
    AcquireError, RunnerError, SummaryError, WorkflowError, WorkflowResult,
};
pub use crate::scanner::events::{
    MessageLevel, NullProgress, ProgressEvent, ProgressMessage, ProgressSink, RecordingProgress,
};
pub use crate::scanner::runner::{ExitPolicy, ScanRun, ScannerRunner};
pub use crate::scanner::state::WorkflowState;
pub use crate::scanner::summary::{count_issues, summarize};
pub use crate::scanner::types::{
    ExecutionTime, Finding, ReportFormat, RunPaths, ScanSummary, SeverityCounts,
};
pub use crate::scanner::workflow::{generate_run_id, RunLayout, ScanOutcome, ScanWorkflow};
