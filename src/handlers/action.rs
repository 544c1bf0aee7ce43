use crate::error::{AppError, Result};
use crate::incident::{ActionIntent, ActionOutcome, ServiceContext};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolActionRequest {
    pub tool_name: Option<String>,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionRequest {
    pub action_type: Option<String>,
    pub service_name: Option<String>,
    pub alert_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionFailure {
    pub error: String,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError(format!("Missing required field: {}", field)))
}

/// POST /action - Forward a raw tool request to the agent.
///
/// Tool failures are reported in the body with `success: false`.
pub async fn tool_action_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ToolActionRequest>,
) -> Result<Json<ActionOutcome>> {
    let tool = required(request.tool_name, "toolName")?;
    let args = match request.args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };

    tracing::info!(tool = %tool, "Raw tool action requested");
    Ok(Json(state.workflow.dispatcher().dispatch_tool(&tool, args).await))
}

/// POST /actions/execute - Run an operator-confirmed remediation intent.
pub async fn execute_action_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteActionRequest>,
) -> Result<Response> {
    let action_type = required(request.action_type, "actionType")?;
    let service = required(request.service_name, "serviceName")?;
    let intent = ActionIntent::parse(&action_type).ok_or_else(|| {
        AppError::ValidationError(format!("Invalid action type: {}", action_type))
    })?;

    tracing::info!(intent = %intent, service = %service, "Executing action");

    let target = ServiceContext::new(service).with_alert(request.alert_id);
    let outcome = state.workflow.execute_action(intent, target).await?;

    Ok(if outcome.success {
        Json(outcome).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ActionFailure {
                error: outcome.message,
            }),
        )
            .into_response()
    })
}
