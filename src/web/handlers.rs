//! Route handlers

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use super::state::{AppState, StatusBoard};
use super::templates::{render_index, IndexPage};
use crate::core::error_handling::{describe_error, log_error_with_context};
use crate::scanner::events::{MessageLevel, ProgressMessage};

#[derive(Debug, Deserialize)]
pub struct ScanForm {
    #[serde(default)]
    pub repo_url: String,
}

fn render(state: &AppState, board: &StatusBoard, status: StatusCode) -> Response {
    let repo_url = board.repo_url.as_deref().unwrap_or(state.default_url());
    let page = IndexPage {
        repo_url,
        state: board.state,
        messages: &board.messages,
        outcome: board.page_outcome(),
        ..IndexPage::new(state.default_url())
    };
    match render_index(state.templates(), &page) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            log::error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

pub async fn index(State(state): State<AppState>) -> Response {
    render(&state, &state.snapshot(), StatusCode::OK)
}

/// Run the workflow for the submitted URL and render the result.
///
/// 409 while another run is in flight, 423 when the old working copy cannot
/// be removed, 500 for any other failure.
pub async fn scan(State(state): State<AppState>, Form(form): Form<ScanForm>) -> Response {
    let url = form.repo_url.trim().to_string();

    let Some(permit) = state.try_begin_run(&url) else {
        log::warn!("Rejected scan of {}: a run is already in progress", url);
        let mut board = state.snapshot();
        board.messages.push(ProgressMessage::new(
            MessageLevel::Warning,
            "A scan is already running. Wait for it to finish and try again.",
        ));
        return render(&state, &board, StatusCode::CONFLICT);
    };

    // The task owns the permit; a disconnecting client does not end the run
    let run_state = state.clone();
    let run = tokio::spawn(async move {
        let _permit = permit;
        let status = run_workflow(&run_state, &url).await;
        (status, run_state.finish_run())
    });

    match run.await {
        Ok((status, board)) => render(&state, &board, status),
        Err(e) => {
            log::error!("Scan task failed: {}", e);
            state.push_message(MessageLevel::Error, "The scan stopped unexpectedly.");
            render(&state, &state.finish_run(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn run_workflow(state: &AppState, url: &str) -> StatusCode {
    let progress = state.progress();
    let result = state
        .workflow()
        .execute(url, state.cancel_token(), &progress)
        .await;

    match result {
        Ok(outcome) => {
            log::info!(
                "Run {} finished with {} issue(s)",
                outcome.run_id,
                outcome.summary.total_issues
            );
            state.record_outcome(outcome);
            StatusCode::OK
        }
        Err(e) => {
            log_error_with_context(&e, "Repository scan");
            state.push_message(MessageLevel::Error, describe_error(&e, "Scan failed"));
            if e.is_permission_denied() {
                StatusCode::LOCKED
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "state": state.current_state() }))
}

pub async fn last(State(state): State<AppState>) -> Response {
    match state.last_outcome() {
        Some(outcome) => Json(outcome).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no scan has completed yet" })),
        )
            .into_response(),
    }
}

pub async fn health() -> &'static str {
    "ok"
}
