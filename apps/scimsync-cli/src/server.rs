//! HTTP trigger for scheduled runs.
//!
//! `POST /sync` and `GET /sync` run one sync and answer with the text
//! report. Runs never overlap; a request arriving mid-run waits for it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::{CliError, CliResult};
use crate::runner::SyncTrigger;

#[derive(Clone)]
pub struct AppState {
    trigger: Arc<dyn SyncTrigger>,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(trigger: Arc<dyn SyncTrigger>) -> Self {
        Self {
            trigger,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sync", get(sync_handler).post(sync_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn sync_handler(State(state): State<AppState>) -> impl IntoResponse {
    let _guard = state.run_lock.lock().await;
    match state.trigger.run().await {
        Ok(stat) => {
            info!(failures = stat.failure_count(), "Triggered sync finished");
            (StatusCode::OK, stat.to_string())
        }
        Err(e) => {
            error!(error = %e, "Triggered sync failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n"))
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error when the address cannot be bound.
pub async fn serve(addr: SocketAddr, trigger: Arc<dyn SyncTrigger>) -> CliResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to address {addr}: {e}")))?;
    info!(%addr, "Server listening");

    axum::serve(listener, router(AppState::new(trigger)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
