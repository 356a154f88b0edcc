//! Clone → scan → summarize, one step after the other
//!
//! `ScanWorkflow` owns the three steps and reports progress through a
//! `ProgressSink`. Each run gets its own paths from `RunLayout` unless a
//! fixed layout was configured.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::acquire::RepositoryAcquirer;
use super::error::{RunnerError, WorkflowError, WorkflowResult};
use super::events::{ProgressEvent, ProgressSink};
use super::runner::ScannerRunner;
use super::state::WorkflowState;
use super::summary::summarize;
use super::types::{ExecutionTime, Finding, ReportFormat, RunPaths, ScanSummary};
use crate::core::cancel::CancelToken;
use crate::core::time::{SystemTimeProvider, TimeProvider};

/// Name of the report file inside a run directory, without extension
pub const REPORT_STEM: &str = "bandit_report";

/// Name of the working copy inside a run directory
pub const CLONE_DIR_NAME: &str = "repo";

/// Where runs put their working copy and report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunLayout {
    /// The same paths for every run; each run replaces the previous one
    Fixed(RunPaths),
    /// A fresh `<root>/<run-id>/` directory per run
    PerRun { root: PathBuf },
}

impl RunLayout {
    pub fn paths_for(&self, run_id: &str, format: ReportFormat) -> RunPaths {
        match self {
            RunLayout::Fixed(paths) => paths.clone(),
            RunLayout::PerRun { root } => {
                let run_dir = root.join(run_id);
                RunPaths {
                    clone_dir: run_dir.join(CLONE_DIR_NAME),
                    report_path: run_dir.join(format!(
                        "{}.{}",
                        REPORT_STEM,
                        format.file_extension()
                    )),
                }
            }
        }
    }

    /// Remove the working copies and reports this layout has produced.
    ///
    /// For `PerRun` only `scan-*` directories under the root are touched.
    /// Returns the number of entries removed.
    pub fn clean(&self) -> WorkflowResult<usize> {
        let workspace_error = |path: &Path, source: io::Error| WorkflowError::Workspace {
            path: path.to_path_buf(),
            source,
        };

        let mut removed = 0;
        match self {
            RunLayout::Fixed(paths) => {
                for (path, is_dir) in [(&paths.clone_dir, true), (&paths.report_path, false)] {
                    let result = if is_dir {
                        std::fs::remove_dir_all(path)
                    } else {
                        std::fs::remove_file(path)
                    };
                    match result {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(workspace_error(path, e)),
                    }
                }
            }
            RunLayout::PerRun { root } => {
                let entries = match std::fs::read_dir(root) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
                    Err(e) => return Err(workspace_error(root, e)),
                };
                for entry in entries {
                    let entry = entry.map_err(|e| workspace_error(root, e))?;
                    let path = entry.path();
                    let is_run = entry.file_name().to_string_lossy().starts_with(RUN_ID_PREFIX);
                    if is_run && path.is_dir() {
                        std::fs::remove_dir_all(&path).map_err(|e| workspace_error(&path, e))?;
                        log::debug!("Removed run directory {}", path.display());
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }
}

const RUN_ID_PREFIX: &str = "scan-";

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique run id: `scan-<UTC timestamp>-<first 12 hex chars of sha256(url, pid, sequence)>`
pub fn generate_run_id(url: &str, at: SystemTime) -> String {
    let sequence = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    run_id_for(url, at, std::process::id(), sequence)
}

fn run_id_for(url: &str, at: SystemTime, pid: u32, sequence: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(pid.to_be_bytes());
    hasher.update(sequence.to_be_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let timestamp = DateTime::<Utc>::from(at).format("%Y%m%d-%H%M%S-%3f");
    format!("{}{}-{}", RUN_ID_PREFIX, timestamp, &digest[..12])
}

/// Everything a front end needs to display a finished run
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub run_id: String,
    pub url: String,
    pub started_at: String,
    pub paths: RunPaths,
    pub summary: ScanSummary,
    pub findings: Vec<Finding>,
    pub report: String,
    pub exit_code: Option<i32>,
}

#[derive(Clone)]
pub struct ScanWorkflow {
    acquirer: RepositoryAcquirer,
    runner: ScannerRunner,
    layout: RunLayout,
    time: Arc<dyn TimeProvider>,
}

impl std::fmt::Debug for ScanWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanWorkflow")
            .field("acquirer", &self.acquirer)
            .field("runner", &self.runner)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl ScanWorkflow {
    pub fn new(acquirer: RepositoryAcquirer, runner: ScannerRunner, layout: RunLayout) -> Self {
        Self {
            acquirer,
            runner,
            layout,
            time: Arc::new(SystemTimeProvider),
        }
    }

    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    pub fn runner(&self) -> &ScannerRunner {
        &self.runner
    }

    /// Run clone, scan and summarize for `url`.
    ///
    /// Emits `StateChanged` for every step, and `Error` before returning any
    /// failure that happened after the run started.
    pub async fn execute(
        &self,
        url: &str,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult<ScanOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(WorkflowError::EmptyUrl);
        }

        let started = self.time.system_time();
        let run_id = generate_run_id(url, started);
        let paths = self.layout.paths_for(&run_id, self.runner.format());
        log::info!("Starting run {} for {}", run_id, url);

        match self.run_steps(url, &paths, cancel, progress).await {
            Ok((summary, findings, report, exit_code)) => {
                progress.notify(&ProgressEvent::StateChanged(WorkflowState::Displayed));
                Ok(ScanOutcome {
                    run_id,
                    url: url.to_string(),
                    started_at: DateTime::<Utc>::from(started).to_rfc3339(),
                    paths,
                    summary,
                    findings,
                    report,
                    exit_code,
                })
            }
            Err(e) => {
                log::debug!("Run {} failed: {}", run_id, e);
                progress.notify(&ProgressEvent::StateChanged(WorkflowState::Error));
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        url: &str,
        paths: &RunPaths,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult<(ScanSummary, Vec<Finding>, String, Option<i32>)> {
        progress.notify(&ProgressEvent::StateChanged(WorkflowState::Cloning));
        if let Some(parent) = paths.clone_dir.parent() {
            create_dir(parent)?;
        }
        self.acquirer
            .acquire(url, &paths.clone_dir, cancel, progress)
            .await?;

        progress.notify(&ProgressEvent::StateChanged(WorkflowState::Scanning));
        if let Some(parent) = paths.report_path.parent() {
            create_dir(parent)?;
        }
        remove_stale_report(&paths.report_path)?;
        let run = self
            .runner
            .run(&paths.clone_dir, &paths.report_path, cancel, progress)
            .await?;

        progress.notify(&ProgressEvent::StateChanged(WorkflowState::Summarizing));
        if !paths.report_path.exists() {
            progress.notify(&ProgressEvent::ReportMissing {
                path: paths.report_path.clone(),
            });
        }
        let mut report = summarize(&paths.report_path, self.runner.format())?;
        report.summary.execution_time = ExecutionTime::Measured(run.elapsed);

        Ok((report.summary, report.findings, report.text, run.exit_code))
    }
}

fn create_dir(path: &Path) -> WorkflowResult<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|source| WorkflowError::Workspace {
        path: path.to_path_buf(),
        source,
    })
}

/// A report left by an earlier run must not be mistaken for this run's
fn remove_stale_report(path: &Path) -> WorkflowResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale report {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RunnerError::Io(e).into()),
    }
}
