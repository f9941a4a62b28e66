//! `archcheck serve` -- HTTP JSON API for the diagram editor.
//!
//! Endpoints:
//! - GET  /health   - Server status and engine name
//! - POST /analyze  - Analyze a graph; `{ success, result }` or
//!   `{ success: false, error, kind }`
//!
//! CORS is permissive: the editor is served from a different origin.
//! All responses use Content-Type: application/json.

mod handlers;
mod state;

use std::sync::Arc;

use archcheck_solver::{ProcessSolver, SolverBackend};
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{handle_analyze, handle_health, handle_not_found};
use self::state::AppState;
use crate::config::ArchcheckConfig;

/// Construct a JSON error response in the analyze envelope.
fn json_error(status: StatusCode, message: &str, kind: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": message, "kind": kind })),
    )
}

/// Build the router around `backend`.
pub(crate) fn router(backend: Arc<dyn SolverBackend>, max_body_bytes: usize) -> Router {
    let state = Arc::new(AppState { backend });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/analyze", post(handle_analyze))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C.
pub async fn start_server(config: ArchcheckConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.server.port;
    tracing::info!(
        program = %config.engine.command.program,
        timeout_secs = config.engine.timeout_secs,
        max_concurrent = config.engine.max_concurrent,
        work_root = %config.engine.work_root().display(),
        "engine configured"
    );
    let backend: Arc<dyn SolverBackend> = Arc::new(ProcessSolver::new(config.engine));
    let app = router(backend, config.server.max_body_bytes);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("archcheck listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
