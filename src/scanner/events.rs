//! Progress events emitted while a run moves through its steps
//!
//! Front ends implement `ProgressSink` to show status lines as they happen;
//! the terminal prints them, the web layer collects them for the page.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use super::state::WorkflowState;
use crate::core::time::round_secs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
    Success,
    Error,
}

/// A status line ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl ProgressMessage {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StateChanged(WorkflowState),
    RemovedExisting { path: PathBuf },
    CloneStarted { url: String },
    Cloned { path: PathBuf },
    ScanStarted { program: String },
    ScanCompleted {
        program: String,
        elapsed: Duration,
        exit_code: Option<i32>,
        /// Whether the exit status counted as a normal completion
        accepted: bool,
    },
    ReportMissing { path: PathBuf },
}

impl ProgressEvent {
    /// User-facing line for this event, `None` for bare state changes
    pub fn message(&self) -> Option<ProgressMessage> {
        use MessageLevel::*;

        let message = match self {
            ProgressEvent::StateChanged(_) => return None,
            ProgressEvent::RemovedExisting { path } => ProgressMessage::new(
                Warning,
                format!("Deleted existing repository directory: {}", path.display()),
            ),
            ProgressEvent::CloneStarted { url } => {
                ProgressMessage::new(Info, format!("Cloning the repository from {}...", url))
            }
            ProgressEvent::Cloned { path } => {
                ProgressMessage::new(Success, format!("Repository cloned to {}", path.display()))
            }
            ProgressEvent::ScanStarted { program } => ProgressMessage::new(
                Info,
                format!("Running {} to check for security vulnerabilities...", program),
            ),
            ProgressEvent::ScanCompleted {
                program,
                elapsed,
                exit_code,
                accepted,
            } => match exit_code {
                _ if *accepted => ProgressMessage::new(
                    Success,
                    format!(
                        "{} scan completed in {:.2} sec.",
                        program,
                        round_secs(*elapsed)
                    ),
                ),
                Some(code) => ProgressMessage::new(
                    Warning,
                    format!("{} exited with status {}; using whatever report it left.", program, code),
                ),
                None => ProgressMessage::new(
                    Warning,
                    format!("{} was terminated by a signal; using whatever report it left.", program),
                ),
            },
            ProgressEvent::ReportMissing { path } => ProgressMessage::new(
                Warning,
                format!("No report was written to {}", path.display()),
            ),
        };
        Some(message)
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Sink that keeps every event in order
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Display lines for the recorded events, in order
    pub fn messages(&self) -> Vec<ProgressMessage> {
        self.events()
            .iter()
            .filter_map(ProgressEvent::message)
            .collect()
    }

    /// States the run passed through, in order
    pub fn states(&self) -> Vec<WorkflowState> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn notify(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
