use crate::state::AppState;
use crate::tooling::ConnectionState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub agent: &'static str,
}

fn agent_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Unconfigured => "unconfigured",
        ConnectionState::Uninitialized => "not_connected",
        ConnectionState::Connected => "connected",
        ConnectionState::Poisoned => "failed",
    }
}

/// GET /health - Liveness probe
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready - Readiness probe. Fails once the agent connection is poisoned,
/// since only a restart can recover it.
pub async fn ready_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadyResponse>) {
    let agent = agent_label(state.agent.state());
    let (status, label) = if state.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(ReadyResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            agent,
        }),
    )
}
