//! Scanner Error Types

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::error_handling::ContextualError;

/// Failures while producing a fresh working copy
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The previous working copy is locked or not ours to delete
    #[error("{message}")]
    PermissionDenied {
        path: PathBuf,
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove existing directory {}: {source}", .path.display())]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to clone {url}: {reason}")]
    Clone { url: String, reason: String },

    #[error("clone of {url} timed out after {}s", .timeout.as_secs())]
    TimedOut { url: String, timeout: Duration },

    #[error("clone of {url} was cancelled")]
    Cancelled { url: String },

    #[error("clone task failed: {0}")]
    Task(String),
}

impl AcquireError {
    pub(crate) fn permission_denied(path: PathBuf, source: io::Error) -> Self {
        let message = format!(
            "Unable to delete {}. Make sure no files are in use.",
            path.display()
        );
        AcquireError::PermissionDenied {
            path,
            message,
            source,
        }
    }
}

impl ContextualError for AcquireError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            AcquireError::PermissionDenied { .. } | AcquireError::InvalidUrl { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            AcquireError::PermissionDenied { message, .. } => Some(message.as_str()),
            AcquireError::InvalidUrl { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// Failures while running the external scanner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{message}")]
    Spawn {
        program: String,
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("scan timed out after {}s", .timeout.as_secs())]
    TimedOut { timeout: Duration },

    #[error("scan was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl RunnerError {
    pub(crate) fn spawn(program: &str, source: io::Error) -> Self {
        let message = if source.kind() == io::ErrorKind::NotFound {
            format!(
                "Scanner executable '{}' was not found. Install it or set scan.scanner in the configuration.",
                program
            )
        } else {
            format!("Failed to start scanner '{}': {}", program, source)
        };
        RunnerError::Spawn {
            program: program.to_string(),
            message,
            source,
        }
    }
}

impl ContextualError for RunnerError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, RunnerError::Spawn { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RunnerError::Spawn { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Failures while reading the scanner report
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("failed to read report {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("report {} is not valid scanner JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ContextualError for SummaryError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Any failure of a whole clone, scan and summarize run
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("repository URL must not be empty")]
    EmptyUrl,

    #[error("failed to prepare run directory {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Scanner(#[from] RunnerError),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

impl WorkflowError {
    /// True for the one failure the user is expected to fix and retry
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            WorkflowError::Acquire(AcquireError::PermissionDenied { .. })
        )
    }
}

impl ContextualError for WorkflowError {
    fn is_user_actionable(&self) -> bool {
        match self {
            WorkflowError::EmptyUrl => true,
            WorkflowError::Workspace { .. } => false,
            WorkflowError::Acquire(e) => e.is_user_actionable(),
            WorkflowError::Scanner(e) => e.is_user_actionable(),
            WorkflowError::Summary(e) => e.is_user_actionable(),
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            WorkflowError::EmptyUrl => Some("Please enter a repository URL."),
            WorkflowError::Workspace { .. } => None,
            WorkflowError::Acquire(e) => e.user_message(),
            WorkflowError::Scanner(e) => e.user_message(),
            WorkflowError::Summary(e) => e.user_message(),
        }
    }
}

pub type AcquireResult<T> = Result<T, AcquireError>;
pub type RunnerResult<T> = Result<T, RunnerError>;
pub type SummaryResult<T> = Result<T, SummaryError>;
pub type WorkflowResult<T> = Result<T, WorkflowError>;
