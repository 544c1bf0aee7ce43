use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Agent connection failed: {0}")]
    ConnectionError(String),

    #[error("Tool '{tool}' call failed: {message}")]
    InvocationError { tool: String, message: String },

    #[error("Tool '{tool}' reported an error: {message}")]
    ToolReportedError { tool: String, message: String },

    #[error("Malformed payload from tool '{tool}': {message}")]
    PayloadError { tool: String, message: String },

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    StorageError(String),
}

impl AppError {
    /// True for failures raised while talking to a resolved tool.
    pub fn is_invocation_failure(&self) -> bool {
        matches!(
            self,
            AppError::InvocationError { .. }
                | AppError::ToolReportedError { .. }
                | AppError::PayloadError { .. }
        )
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::NotFound(what) => {
                tracing::debug!(what = %what, "Not found");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::ConnectionError(e) => {
                tracing::error!(error = %e, "Agent connection unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::ConfigError(e) | AppError::StorageError(e) => {
                tracing::error!(error = %e, "Service error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::InvocationError { tool, message }
            | AppError::ToolReportedError { tool, message }
            | AppError::PayloadError { tool, message } => {
                tracing::error!(tool = %tool, error = %message, "Tool failure");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError::ValidationError("title is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_connection_maps_to_503() {
        let response = AppError::ConnectionError("refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invocation_display_names_tool() {
        let err = AppError::InvocationError {
            tool: "list_commits".into(),
            message: "timed out".into(),
        };
        assert_eq!(err.to_string(), "Tool 'list_commits' call failed: timed out");
        assert!(err.is_invocation_failure());
        assert!(!AppError::NotFound("x".into()).is_invocation_failure());
    }
}
