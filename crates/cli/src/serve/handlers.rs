//! HTTP route handlers: health and analyze.

use std::sync::Arc;

use archcheck_analyze::{run_analysis, ErrorKind};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found", "not_found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.backend.name(),
    });
    (StatusCode::OK, Json(response))
}

/// POST /analyze
///
/// The body is the editor's graph. Structural problems with the graph are
/// 422, engine failures 502, unparseable bodies 400.
pub(crate) async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Json(graph) = match body {
        Ok(b) => b,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected analyze body");
            return json_error(StatusCode::BAD_REQUEST, &rejection.body_text(), "bad_request")
                .into_response();
        }
    };

    match run_analysis(&graph, state.backend.as_ref()).await {
        Ok(report) => {
            let response = serde_json::json!({ "success": true, "result": report });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let kind = e.kind();
            let status = match kind {
                ErrorKind::Structural => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::EngineInvocation => StatusCode::BAD_GATEWAY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(kind = kind.as_str(), error = %e, "analysis request failed");
            json_error(status, &e.to_string(), kind.as_str()).into_response()
        }
    }
}
