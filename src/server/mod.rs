//! HTTP surface the browser UI binds to.

pub mod handlers;


use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::chat_handler::ChatHandler;
use crate::core::config::Config;
use crate::core::model::ModelManager;
use crate::utils::logging::TranscriptLog;
use handlers::{chat_handler, personas_handler, status_handler};

#[derive(Clone)]
pub struct AppState {
    pub handler: ChatHandler,
    pub manager: Arc<dyn ModelManager>,
    pub config: Arc<Config>,
    pub transcript: Option<Arc<TranscriptLog>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/personas", get(personas_handler))
        .route("/api/status", get(status_handler))
        .with_state(state)
}

/// Serve until Ctrl-C, then cancel `shutdown` so background loaders stop.
pub async fn serve(
    state: AppState,
    bind: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "listening");

    let signal = shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("shutting down"),
                _ = signal.cancelled() => {}
            }
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    Ok(())
}
