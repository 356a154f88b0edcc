//! Workflow state machine
//!
//! `Idle → Cloning → Scanning → Summarizing → Displayed`, with `Error`
//! reachable from every active state. `Displayed` and `Error` both return to
//! `Idle` or start a new run directly.

use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowState {
    #[default]
    Idle,
    Cloning,
    Scanning,
    Summarizing,
    Displayed,
    Error,
}

impl WorkflowState {
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;

        matches!(
            (self, next),
            (Idle, Cloning)
                | (Cloning, Scanning)
                | (Scanning, Summarizing)
                | (Summarizing, Displayed)
                | (Cloning | Scanning | Summarizing, Error)
                | (Displayed | Error, Idle | Cloning)
        )
    }

    /// True while a run is in flight
    pub fn is_active(self) -> bool {
        matches!(
            self,
            WorkflowState::Cloning | WorkflowState::Scanning | WorkflowState::Summarizing
        )
    }
}
