use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use super::error::{ServerError, ServerResult};
use super::handlers;
use super::state::AppState;
use crate::core::cancel::CancelToken;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/scan", post(handlers::scan))
        .route("/api/status", get(handlers::status))
        .route("/api/last", get(handlers::last))
        .route("/health", get(handlers::health))
        .with_state(state)
}

pub async fn bind(addr: &str) -> ServerResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve until `shutdown` is cancelled
pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancelToken) -> ServerResult<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    log::info!("Server stopped");
    Ok(())
}
