use crate::error::{AppError, Result};
use crate::tooling::types::ToolSession;
use serde_json::Value;
use std::sync::Arc;

/// Payload returned by a successful tool call. Interpretation is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    pub tool: String,
    pub text: String,
}

impl RawResult {
    /// Parse the text payload as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.text).map_err(|e| AppError::PayloadError {
            tool: self.tool.clone(),
            message: format!("payload is not valid JSON: {}", e),
        })
    }
}

/// Single call-and-collect round trip against a session.
#[derive(Clone)]
pub struct Invoker {
    session: Arc<dyn ToolSession>,
}

impl Invoker {
    pub fn new(session: Arc<dyn ToolSession>) -> Self {
        Self { session }
    }

    /// Invoke `tool` with `arguments`.
    ///
    /// Transport failures surface as `InvocationError`; a completed call whose
    /// result carries the error flag surfaces as `ToolReportedError`.
    pub async fn invoke(&self, tool: &str, arguments: Value) -> Result<RawResult> {
        tracing::debug!(tool, "Invoking remote tool");

        let result = match self.session.call_tool(tool, arguments).await {
            Ok(result) => result,
            Err(e) => {
                metrics::counter!("tool_invocations_total", "outcome" => "transport_error")
                    .increment(1);
                return Err(match e {
                    AppError::InvocationError { .. } => e,
                    other => AppError::InvocationError {
                        tool: tool.to_string(),
                        message: other.to_string(),
                    },
                });
            }
        };

        let text = result.first_text().unwrap_or_default().to_string();

        if result.is_error() {
            metrics::counter!("tool_invocations_total", "outcome" => "tool_error").increment(1);
            tracing::warn!(tool, message = %text, "Tool reported an error");
            return Err(AppError::ToolReportedError {
                tool: tool.to_string(),
                message: if text.is_empty() {
                    "no details provided".to_string()
                } else {
                    text
                },
            });
        }

        metrics::counter!("tool_invocations_total", "outcome" => "ok").increment(1);
        Ok(RawResult {
            tool: tool.to_string(),
            text,
        })
    }
}
