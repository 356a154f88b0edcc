//! Web surface
//!
//! A single form page served with axum. `POST /scan` runs the workflow in
//! the request and renders the page with its messages, metrics and report;
//! `/api/*` exposes the same state as JSON.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod templates;

pub use error::{ServerError, ServerResult};
pub use server::{bind, router, serve};
pub use state::AppState;
