//! Admin HTTP endpoints.
//!
//! - `GET /health` liveness, version and network
//! - `GET /metrics` Prometheus text format
//! - `GET /swaps` registry counts per state
//! - `GET /swaps/:id` stored swap record

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use htlc_coordinator::{SwapId, SwapOrchestrator};
use htlc_telemetry::log_swap_event;
use std::sync::Arc;
use tracing::warn;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    /// Coordinator being served.
    pub orchestrator: Arc<SwapOrchestrator>,
    /// Network label reported by `/health`.
    pub network: String,
}

/// Build the admin router.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/swaps", get(swap_stats))
        .route("/swaps/:id", get(swap_by_id))
        .with_state(state)
}

async fn health_check(State(state): State<AdminState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "relayer-node",
        "version": env!("CARGO_PKG_VERSION"),
        "network": state.network,
    }))
}

async fn metrics() -> Response {
    match htlc_telemetry::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "[htlc] Metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn swap_stats(State(state): State<AdminState>) -> impl IntoResponse {
    Json(state.orchestrator.registry().stats())
}

async fn swap_by_id(State(state): State<AdminState>, Path(raw): Path<String>) -> Response {
    let id = match SwapId::parse(&raw) {
        Ok(id) => id,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    match state.orchestrator.registry().get(&id) {
        Some(swap) => {
            log_swap_event!(debug, "[htlc] Swap record served", swap.id, swap.state);
            Json(swap).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, &format!("swap not found: {id}")),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
