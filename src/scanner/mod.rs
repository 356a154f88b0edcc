//! Scanner Component
//!
//! The three steps of a security scan and the workflow that chains them:
//!
//! - **Repository Acquirer** (`acquire`): fresh working copy via gix
//! - **Scanner Runner** (`runner`): external scanner as a child process
//! - **Report Summarizer** (`summary`): issue counts from the report file
//!
//! `workflow::ScanWorkflow` runs them in order and reports progress as
//! `events::ProgressEvent`s.

pub mod acquire;
pub mod api;
pub mod error;
pub mod events;
pub mod runner;
pub mod state;
pub mod summary;
pub mod types;
pub mod workflow;

pub use error::{AcquireError, RunnerError, SummaryError, WorkflowError, WorkflowResult};
pub use workflow::{ScanOutcome, ScanWorkflow};
