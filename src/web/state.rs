//! Shared state of the web surface
//!
//! One `AppState` is cloned into every handler. It holds the configured
//! workflow, the run guard that keeps runs from overlapping and the status
//! board the page is rendered from.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tera::Tera;

use super::error::ServerResult;
use super::templates;
use crate::core::cancel::CancelToken;
use crate::scanner::events::{MessageLevel, ProgressEvent, ProgressMessage, ProgressSink};
use crate::scanner::state::WorkflowState;
use crate::scanner::workflow::{ScanOutcome, ScanWorkflow};

/// What the page shows: current state, messages of the latest run and the
/// last successful outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusBoard {
    pub state: WorkflowState,
    pub repo_url: Option<String>,
    pub messages: Vec<ProgressMessage>,
    pub last: Option<ScanOutcome>,
    /// `last` belongs to the latest run rather than an earlier one
    #[serde(skip)]
    pub last_is_current: bool,
}

impl StatusBoard {
    /// Results to render; none once a later run has started or failed
    pub fn page_outcome(&self) -> Option<&ScanOutcome> {
        self.last.as_ref().filter(|_| self.last_is_current)
    }

    fn apply(&mut self, event: &ProgressEvent) {
        if let ProgressEvent::StateChanged(next) = event {
            if !self.state.can_transition_to(*next) {
                log::warn!("Unexpected state change {} -> {}", self.state, next);
            }
            self.state = *next;
        }
        if let Some(message) = event.message() {
            self.messages.push(message);
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    workflow: Arc<ScanWorkflow>,
    default_url: Arc<str>,
    cancel: CancelToken,
    run_guard: Arc<tokio::sync::Mutex<()>>,
    board: Arc<Mutex<StatusBoard>>,
    templates: Arc<Tera>,
}

/// Held for the duration of a run; dropping it admits the next one
pub type RunPermit = tokio::sync::OwnedMutexGuard<()>;

impl AppState {
    pub fn new(
        workflow: ScanWorkflow,
        default_url: impl Into<String>,
        cancel: CancelToken,
    ) -> ServerResult<Self> {
        Ok(Self {
            workflow: Arc::new(workflow),
            default_url: Arc::from(default_url.into()),
            cancel,
            run_guard: Arc::new(tokio::sync::Mutex::new(())),
            board: Arc::new(Mutex::new(StatusBoard::default())),
            templates: Arc::new(templates::build()?),
        })
    }

    pub fn workflow(&self) -> &ScanWorkflow {
        &self.workflow
    }

    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn templates(&self) -> &Tera {
        &self.templates
    }

    /// `None` while another run holds the permit
    pub fn try_begin_run(&self, repo_url: &str) -> Option<RunPermit> {
        let permit = self.run_guard.clone().try_lock_owned().ok()?;
        let mut board = self.board();
        board.repo_url = Some(repo_url.to_string());
        board.messages.clear();
        board.last_is_current = false;
        Some(permit)
    }

    pub fn record_outcome(&self, outcome: ScanOutcome) {
        let mut board = self.board();
        board.last = Some(outcome);
        board.last_is_current = true;
    }

    /// Snapshot of the finished run for its response page, then return the
    /// board to `Idle`
    pub fn finish_run(&self) -> StatusBoard {
        let mut board = self.board();
        let finished = board.clone();
        if matches!(board.state, WorkflowState::Displayed | WorkflowState::Error) {
            board.state = WorkflowState::Idle;
        }
        finished
    }

    /// Add a line that did not come from a workflow event
    pub fn push_message(&self, level: MessageLevel, text: impl Into<String>) {
        self.board().messages.push(ProgressMessage::new(level, text));
    }

    pub fn snapshot(&self) -> StatusBoard {
        self.board().clone()
    }

    pub fn current_state(&self) -> WorkflowState {
        self.board().state
    }

    pub fn last_outcome(&self) -> Option<ScanOutcome> {
        self.board().last.clone()
    }

    pub fn progress(&self) -> BoardProgress {
        BoardProgress {
            board: self.board.clone(),
        }
    }

    fn board(&self) -> MutexGuard<'_, StatusBoard> {
        // A panic while holding the lock leaves plain data behind; keep using it
        self.board.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `ProgressSink` that writes into the status board
#[derive(Clone)]
pub struct BoardProgress {
    board: Arc<Mutex<StatusBoard>>,
}

impl ProgressSink for BoardProgress {
    fn notify(&self, event: &ProgressEvent) {
        let mut board = self.board.lock().unwrap_or_else(|p| p.into_inner());
        board.apply(event);
    }
}
