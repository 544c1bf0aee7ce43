//! In-process agent with scripted tool responses.
//!
//! Implements both [`ToolConnector`] and [`ToolSession`] so the resolver,
//! adapters, aggregator and dispatcher can run without a network endpoint.

use crate::error::{AppError, Result};
use crate::tooling::types::{ToolCallResult, ToolConnector, ToolDescriptor, ToolSession};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(ToolCallResult),
    Fail(String),
}

/// A tool call observed by the scripted agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub tool: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    tools: Vec<ToolDescriptor>,
    responses: HashMap<String, Scripted>,
    connect_error: Option<String>,
    connect_delay: Option<Duration>,
    connects: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedAgent {
    /// Agent advertising `tools` in the given order.
    pub fn new(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|name| ToolDescriptor::named(*name)).collect(),
            ..Self::default()
        }
    }

    /// Reply to calls of `tool` with `result`.
    pub fn respond(mut self, tool: &str, result: ToolCallResult) -> Self {
        self.responses
            .insert(tool.to_string(), Scripted::Reply(result));
        self
    }

    /// Reply to calls of `tool` with a JSON text payload.
    pub fn respond_json(self, tool: &str, payload: Value) -> Self {
        self.respond(tool, ToolCallResult::text(payload.to_string()))
    }

    /// Fail calls of `tool` at the transport level.
    pub fn fail(mut self, tool: &str, message: &str) -> Self {
        self.responses
            .insert(tool.to_string(), Scripted::Fail(message.to_string()));
        self
    }

    /// Make every connection attempt fail with `message`.
    pub fn refuse_connections(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    /// Delay each connection attempt, widening the window for concurrent callers.
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn connector(&self) -> Arc<dyn ToolConnector> {
        Arc::new(self.clone())
    }

    pub fn session(&self) -> Arc<dyn ToolSession> {
        Arc::new(self.clone())
    }

    /// Number of connection attempts made so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ToolConnector for ScriptedAgent {
    async fn connect(&self) -> Result<Arc<dyn ToolSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.connect_error {
            Some(message) => Err(AppError::ConnectionError(message.clone())),
            None => Ok(self.session()),
        }
    }
}

#[async_trait]
impl ToolSession for ScriptedAgent {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                tool: name.to_string(),
                arguments,
            });

        match self.responses.get(name) {
            Some(Scripted::Reply(result)) => Ok(result.clone()),
            Some(Scripted::Fail(message)) => Err(AppError::InvocationError {
                tool: name.to_string(),
                message: message.clone(),
            }),
            None => Ok(ToolCallResult::error(format!("Unknown tool: {}", name))),
        }
    }
}
