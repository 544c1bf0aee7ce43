//! Data-source adapters.
//!
//! Every adapter follows the same protocol: obtain the shared connection,
//! resolve its capability, invoke the resolved tool with adapter-specific
//! arguments, then normalize each upstream record field by field.
//!
//! An unresolved capability is degraded mode, not an error: the adapter logs
//! a warning and returns an empty collection. Connection, invocation and
//! parse failures propagate.

pub mod chat;
pub mod commits;
pub mod logs;
pub mod rules;
pub mod tickets;

use crate::config::SourceSettings;
use crate::error::Result;
use crate::tooling::{Capability, ConnectionManager, RawResult};
use serde_json::Value;
use std::sync::Arc;

pub use rules::{Fallback, FieldRule};

/// Upstream payload after JSON decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A record array, either bare or under one of the known collection keys.
    Records(Vec<Value>),
    /// Valid JSON with no record array we understand.
    Unrecognized(Value),
}

impl Payload {
    /// Decode a raw result. Fails only when the text is not JSON at all.
    pub fn parse(raw: &RawResult, collection_keys: &[&str]) -> Result<Self> {
        Ok(Self::classify(raw.json()?, collection_keys))
    }

    pub fn classify(value: Value, collection_keys: &[&str]) -> Self {
        match value {
            Value::Array(items) => Payload::Records(items),
            Value::Object(mut map) => {
                let key = collection_keys
                    .iter()
                    .find(|key| map.get(**key).is_some_and(Value::is_array));
                match key.and_then(|key| map.remove(*key)) {
                    Some(Value::Array(items)) => Payload::Records(items),
                    _ => Payload::Unrecognized(Value::Object(map)),
                }
            }
            other => Payload::Unrecognized(other),
        }
    }

    fn shape(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Adapters over the agent's data-source tools.
#[derive(Clone)]
pub struct DataSources {
    agent: Arc<ConnectionManager>,
    settings: SourceSettings,
}

impl DataSources {
    pub fn new(agent: Arc<ConnectionManager>, settings: SourceSettings) -> Self {
        Self { agent, settings }
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    /// Shared adapter protocol. Returns the raw upstream records, or an empty
    /// vector when the capability is unresolved or the payload unrecognized.
    async fn fetch_records(
        &self,
        capability: &Capability,
        collection_keys: &[&str],
        arguments: Value,
    ) -> Result<Vec<Value>> {
        let connection = self.agent.connection().await?;

        let Some(tool) = connection.registry().lookup(capability) else {
            tracing::warn!(
                capability = capability.name,
                "No advertised tool matches capability, returning empty collection"
            );
            return Ok(Vec::new());
        };

        tracing::info!(capability = capability.name, tool, "Calling data-source tool");
        let raw = connection.invoker().invoke(tool, arguments).await?;

        match Payload::parse(&raw, collection_keys)? {
            Payload::Records(items) => {
                tracing::debug!(capability = capability.name, count = items.len(), "Records received");
                Ok(items)
            }
            Payload::Unrecognized(value) => {
                tracing::warn!(
                    capability = capability.name,
                    tool,
                    shape = Payload::shape(&value),
                    "Unrecognized payload shape, returning empty collection"
                );
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_bare_array() {
        let payload = Payload::classify(json!([{ "id": 1 }]), &["issues"]);
        assert_eq!(payload, Payload::Records(vec![json!({ "id": 1 })]));
    }

    #[test]
    fn test_classify_wrapped_array() {
        let payload = Payload::classify(json!({ "total": 1, "issues": [{ "key": "OPS-1" }] }), &["issues"]);
        assert_eq!(payload, Payload::Records(vec![json!({ "key": "OPS-1" })]));
    }

    #[test]
    fn test_classify_unrecognized() {
        assert!(matches!(
            Payload::classify(json!({ "issues": "none" }), &["issues"]),
            Payload::Unrecognized(_)
        ));
        assert!(matches!(
            Payload::classify(json!("plain"), &["issues"]),
            Payload::Unrecognized(_)
        ));
    }
}
