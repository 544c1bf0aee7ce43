pub mod action;
pub mod health;
pub mod incident;

pub use action::{execute_action_handler, tool_action_handler};
pub use health::{health_handler, ready_handler};
pub use incident::{
    analyze_incident_handler, create_incident_handler, get_incident_handler,
    list_incidents_handler, resolve_incident_handler,
};

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Every HTTP endpoint except `/metrics`, which needs the recorder handle.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/incident", post(create_incident_handler))
        .route("/incidents", get(list_incidents_handler))
        .route("/incidents/:id", get(get_incident_handler))
        .route("/incidents/:id/analyze", post(analyze_incident_handler))
        .route("/incidents/:id/resolve", post(resolve_incident_handler))
        .route("/action", post(tool_action_handler))
        .route("/actions/execute", post(execute_action_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
