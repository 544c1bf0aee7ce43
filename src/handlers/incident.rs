use crate::error::Result;
use crate::incident::{IncidentDetails, IncidentReport, NewIncident, OpenedIncident};
use crate::persistence::Row;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub error_keyword: String,
    pub repo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateIncidentResponse {
    pub success: bool,
    #[serde(flatten)]
    pub incident: OpenedIncident,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub incident_id: String,
    pub report: IncidentReport,
}

#[derive(Debug, Serialize)]
pub struct IncidentListResponse {
    pub incidents: Vec<Row>,
}

/// POST /incident - Open an incident, gather context and generate its report.
pub async fn create_incident_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateIncidentRequest>,
) -> Result<Json<CreateIncidentResponse>> {
    let incident = state
        .workflow
        .open(NewIncident {
            title: request.title,
            service: request.service,
            error_keyword: request.error_keyword,
            repo: request.repo,
        })
        .await?;

    Ok(Json(CreateIncidentResponse {
        success: true,
        incident,
    }))
}

/// POST /incidents/:id/analyze - Regenerate context and report.
pub async fn analyze_incident_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AnalyzeResponse>> {
    let report = state.workflow.analyze(&id).await?;
    Ok(Json(AnalyzeResponse {
        success: true,
        incident_id: id,
        report,
    }))
}

/// GET /incidents
pub async fn list_incidents_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IncidentListResponse>> {
    let incidents = state.workflow.list().await?;
    Ok(Json(IncidentListResponse { incidents }))
}

/// GET /incidents/:id
pub async fn get_incident_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<IncidentDetails>> {
    Ok(Json(state.workflow.details(&id).await?))
}

/// POST /incidents/:id/resolve
pub async fn resolve_incident_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Row>> {
    Ok(Json(state.workflow.resolve(&id).await?))
}
