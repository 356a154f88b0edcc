//! Scanner Runner
//!
//! Runs the external static-analysis tool as
//! `<program> -r <target> -f <txt|json> -o <report>` and times it.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::error::{RunnerError, RunnerResult};
use super::events::{ProgressEvent, ProgressSink};
use super::types::ReportFormat;
use crate::core::cancel::CancelToken;
use crate::core::time::{SystemTimeProvider, TimeProvider};

/// Lines of stderr kept when reporting a failed run
const STDERR_TAIL_LINES: usize = 20;

/// How the scanner's exit status is judged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Ignore the exit status and summarize whatever report exists
    Lenient,
    /// Fail unless the exit status is one of `accepted`
    Strict { accepted: Vec<i32> },
}

impl Default for ExitPolicy {
    /// Bandit exits 1 when it reports issues, so both 0 and 1 are normal
    fn default() -> Self {
        ExitPolicy::Strict {
            accepted: vec![0, 1],
        }
    }
}

impl ExitPolicy {
    pub fn accepts(&self, code: Option<i32>) -> bool {
        match self {
            ExitPolicy::Lenient => true,
            ExitPolicy::Strict { accepted } => code.is_some_and(|c| accepted.contains(&c)),
        }
    }
}

/// Result of one scanner invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRun {
    pub elapsed: Duration,
    pub exit_code: Option<i32>,
}

#[derive(Clone)]
pub struct ScannerRunner {
    program: String,
    format: ReportFormat,
    exit_policy: ExitPolicy,
    timeout: Option<Duration>,
    time: Arc<dyn TimeProvider>,
}

impl ScannerRunner {
    pub fn new(program: impl Into<String>, format: ReportFormat) -> Self {
        Self {
            program: program.into(),
            format,
            exit_policy: ExitPolicy::default(),
            timeout: None,
            time: Arc::new(SystemTimeProvider),
        }
    }

    pub fn with_exit_policy(mut self, exit_policy: ExitPolicy) -> Self {
        self.exit_policy = exit_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Arguments passed to the scanner for `target` and `report_path`
    pub fn arguments(&self, target: &Path, report_path: &Path) -> Vec<String> {
        vec![
            "-r".to_string(),
            target.to_string_lossy().into_owned(),
            "-f".to_string(),
            self.format.scanner_flag().to_string(),
            "-o".to_string(),
            report_path.to_string_lossy().into_owned(),
        ]
    }

    /// Run the scanner against `target`, writing the report to `report_path`.
    ///
    /// The child is killed if the timeout elapses or `cancel` fires. Its
    /// output is captured and only used to explain a rejected exit status.
    pub async fn run(
        &self,
        target: &Path,
        report_path: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> RunnerResult<ScanRun> {
        let args = self.arguments(target, report_path);
        log::info!("Running {} {}", self.program, args.join(" "));
        progress.notify(&ProgressEvent::ScanStarted {
            program: self.program.clone(),
        });

        let start = self.time.now();
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::spawn(&self.program, e))?;

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = deadline => {
                log::warn!("{} timed out; killing it", self.program);
                return Err(RunnerError::TimedOut {
                    timeout: self.timeout.unwrap_or_default(),
                });
            }
            _ = cancel.cancelled() => {
                log::warn!("{} cancelled; killing it", self.program);
                return Err(RunnerError::Cancelled);
            }
        };
        let elapsed = self.time.now().saturating_duration_since(start);

        let exit_code = output.status.code();
        let accepted = self.exit_policy.accepts(exit_code);
        log::info!(
            "{} finished in {:.2}s with exit code {:?}",
            self.program,
            elapsed.as_secs_f64(),
            exit_code
        );
        log::debug!("{} stdout: {} bytes", self.program, output.stdout.len());
        progress.notify(&ProgressEvent::ScanCompleted {
            program: self.program.clone(),
            elapsed,
            exit_code,
            accepted,
        });

        if !accepted {
            return Err(RunnerError::ExitStatus {
                program: self.program.clone(),
                code: exit_code,
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(ScanRun { elapsed, exit_code })
    }
}

impl std::fmt::Debug for ScannerRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerRunner")
            .field("program", &self.program)
            .field("format", &self.format)
            .field("exit_policy", &self.exit_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
