//! Shapes exchanged with a connected agent and the seams the rest of the
//! crate talks through.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A named capability advertised by the connected agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// One block of a `tools/call` result. Only text blocks carry payloads we use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Result of a completed `tools/call` round trip.
///
/// `is_error` is the application-level flag: the call itself went through but
/// the tool reported a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: Some(text.into()),
            }],
            is_error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: Some(true),
            ..Self::text(text)
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| block.text.as_deref())
    }
}

/// An established session with the remote agent.
///
/// `call_tool` fails only when the round trip itself fails; tool-reported
/// errors come back as `Ok` with `is_error` set.
#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult>;
}

/// Opens sessions with the remote agent.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ToolSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_result_parses_error_flag() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "repo not found" }],
            "isError": true
        }))
        .unwrap();

        assert!(result.is_error());
        assert_eq!(result.first_text(), Some("repo not found"));
    }

    #[test]
    fn test_call_result_tolerates_missing_fields() {
        let result: ToolCallResult = serde_json::from_value(json!({})).unwrap();

        assert!(!result.is_error());
        assert_eq!(result.first_text(), None);
    }

    #[test]
    fn test_first_text_skips_non_text_blocks() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                { "type": "image", "data": "..." },
                { "type": "text", "text": "[]" }
            ]
        }))
        .unwrap();

        assert_eq!(result.first_text(), Some("[]"));
    }
}
