//! Streamable-HTTP client for the agent tool protocol (MCP).
//!
//! Each JSON-RPC message is POSTed to a single endpoint. Servers answer with
//! either a plain JSON body or an event stream whose `data:` lines carry the
//! response. The session id handed out during `initialize` is echoed on every
//! later request.

use crate::error::{AppError, Result};
use crate::tooling::types::{ToolCallResult, ToolConnector, ToolDescriptor, ToolSession};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub const PROTOCOL_VERSION: &str = "2025-03-26";

const SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound on `tools/list` pages followed during discovery.
const MAX_TOOL_PAGES: usize = 32;

pub struct HttpConnector {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpConnector {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ToolConnector for HttpConnector {
    async fn connect(&self) -> Result<Arc<dyn ToolSession>> {
        tracing::info!(endpoint = %self.endpoint, "Opening agent session");

        let mut session = HttpSession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            session_id: None,
            next_id: AtomicI64::new(1),
        };

        let id = session.next_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "incident-desk",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }
        });

        let (reply, session_id) = session
            .post(&request)
            .await
            .map_err(AppError::ConnectionError)?;
        session.session_id = session_id;

        let result = reply
            .ok_or_else(|| "initialize returned no body".to_string())
            .and_then(|body| extract_result(&body, id))
            .map_err(AppError::ConnectionError)?;

        tracing::info!(
            server = result["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            protocol = result["protocolVersion"].as_str().unwrap_or(PROTOCOL_VERSION),
            "Agent session initialized"
        );

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        session
            .post(&notification)
            .await
            .map_err(AppError::ConnectionError)?;

        Ok(Arc::new(session))
    }
}

pub struct HttpSession {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    session_id: Option<String>,
    next_id: AtomicI64,
}

impl HttpSession {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// POST one JSON-RPC message. Returns the decoded body (if any) and the
    /// session id header (if any).
    async fn post(
        &self,
        message: &Value,
    ) -> std::result::Result<(Option<Value>, Option<String>), String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let body = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status.as_u16(), body.trim()));
        }
        if body.trim().is_empty() {
            return Ok((None, session_id));
        }

        let request_id = message.get("id").and_then(Value::as_i64);
        let decoded = if is_stream {
            parse_event_stream(&body, request_id)
        } else {
            serde_json::from_str(&body).ok()
        };

        match decoded {
            Some(value) => Ok((Some(value), session_id)),
            None => Err(format!("undecodable response body: {}", truncate(&body, 200))),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> std::result::Result<Value, String> {
        let id = self.next_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        let (reply, _) = self.post(&request).await?;
        let body = reply.ok_or_else(|| format!("{} returned no body", method))?;
        extract_result(&body, id)
    }
}

#[async_trait]
impl ToolSession for HttpSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self
                .rpc("tools/list", params)
                .await
                .map_err(AppError::ConnectionError)?;

            let page = result["tools"].as_array().ok_or_else(|| {
                AppError::ConnectionError("tools/list result has no tools array".to_string())
            })?;
            tools.extend(
                page.iter()
                    .filter_map(|v| serde_json::from_value::<ToolDescriptor>(v.clone()).ok()),
            );

            match result["nextCursor"].as_str() {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next) => {
                    cursor = Some(next.to_string());
                }
                _ => return Ok(tools),
            }
        }

        tracing::warn!(pages = MAX_TOOL_PAGES, "Stopped following tools/list pagination");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let result = self
            .rpc("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
            .map_err(|message| AppError::InvocationError {
                tool: name.to_string(),
                message,
            })?;

        serde_json::from_value(result).map_err(|e| AppError::InvocationError {
            tool: name.to_string(),
            message: format!("unexpected tools/call result: {}", e),
        })
    }
}

/// Pull `result` out of a JSON-RPC response, turning `error` into a message.
fn extract_result(body: &Value, id: i64) -> std::result::Result<Value, String> {
    if let Some(error) = body.get("error") {
        return Err(format!(
            "{} (code {})",
            error["message"].as_str().unwrap_or("unknown error"),
            error["code"].as_i64().unwrap_or_default()
        ));
    }
    if let Some(got) = body.get("id").and_then(Value::as_i64) {
        if got != id {
            return Err(format!("response id {} does not match request id {}", got, id));
        }
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| "response has neither result nor error".to_string())
}

/// Find the JSON-RPC response in an event-stream body.
///
/// Prefers the message whose id matches `request_id`; falls back to the last
/// decodable message carrying a `result` or `error`.
fn parse_event_stream(body: &str, request_id: Option<i64>) -> Option<Value> {
    let mut fallback = None;
    for line in body.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(data.trim()) else {
            continue;
        };
        if value.get("result").is_none() && value.get("error").is_none() {
            continue;
        }
        if request_id.is_some() && value.get("id").and_then(Value::as_i64) == request_id {
            return Some(value);
        }
        fallback = Some(value);
    }
    fallback
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
