use crate::error::Result;
use crate::incident::model::{LogEntry, LogLevel};
use crate::sources::rules::{Fallback, FieldRule};
use crate::sources::DataSources;
use crate::tooling::Capability;
use serde_json::{json, Value};

const COLLECTION_KEYS: &[&str] = &["logs", "entries", "items"];

pub const LOG_TIMESTAMP: FieldRule = FieldRule::new(
    "timestamp",
    &["/timestamp", "/time", "/@timestamp"],
    Fallback::Now,
);
pub const LOG_LEVEL: FieldRule =
    FieldRule::new("level", &["/level", "/severity"], Fallback::Literal("ERROR"));
pub const LOG_MESSAGE: FieldRule = FieldRule::new(
    "message",
    &["/message", "/msg", "/text"],
    Fallback::Literal("No message"),
);
pub const LOG_SERVICE: FieldRule = FieldRule::new(
    "service",
    &["/service", "/service_name", "/source"],
    Fallback::Request,
);

/// Normalize one log record. `service` fills in records that omit it.
pub fn normalize_log(record: &Value, service: &str) -> LogEntry {
    LogEntry {
        timestamp: LOG_TIMESTAMP.extract(record, ""),
        level: LogLevel::parse(&LOG_LEVEL.extract(record, "")),
        message: LOG_MESSAGE.extract(record, ""),
        service: LOG_SERVICE.extract(record, service),
    }
}

impl DataSources {
    /// Error logs for `service` over the last `minutes`.
    pub async fn error_logs(&self, service: &str, minutes: u32) -> Result<Vec<LogEntry>> {
        let arguments = json!({
            "service": service,
            "minutes": minutes,
            "query": service,
        });

        let records = self
            .fetch_records(&Capability::LOGS, COLLECTION_KEYS, arguments)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, service, "Fetching logs failed");
                e
            })?;

        Ok(records.iter().map(|r| normalize_log(r, service)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tooling::testing::ScriptedAgent;
    use crate::tooling::ConnectionManager;
    use std::sync::Arc;

    #[test]
    fn test_normalize_defaults_service_and_level() {
        let entry = normalize_log(&json!({ "msg": "QueryTimeout after 5002ms" }), "auth-service");

        assert_eq!(entry.service, "auth-service");
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "QueryTimeout after 5002ms");
        assert!(!entry.timestamp.is_empty());
    }

    #[test]
    fn test_normalize_alternate_field_names() {
        let entry = normalize_log(
            &json!({
                "@timestamp": "2026-10-19T08:00:00Z",
                "severity": "warning",
                "text": "disk 91% full",
                "service_name": "db"
            }),
            "api",
        );

        assert_eq!(entry.timestamp, "2026-10-19T08:00:00Z");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.message, "disk 91% full");
        assert_eq!(entry.service, "db");
    }

    #[tokio::test]
    async fn test_error_logs_accepts_wrapped_payload() {
        let agent = ScriptedAgent::new(&["loki__query_logs"]).respond_json(
            "loki__query_logs",
            json!({ "logs": [{ "level": "ERROR", "message": "ConnectionRefused" }] }),
        );
        let config = Config::from_lookup(|_| None).unwrap();
        let sources = DataSources::new(Arc::new(ConnectionManager::new(agent.connector())), config.sources);

        let logs = sources.error_logs("checkout", 60).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].service, "checkout");
        assert_eq!(
            agent.calls()[0].arguments,
            json!({ "service": "checkout", "minutes": 60, "query": "checkout" })
        );
    }

    #[tokio::test]
    async fn test_unrecognized_payload_is_empty() {
        let agent = ScriptedAgent::new(&["get_logs"])
            .respond_json("get_logs", json!({ "status": "indexing" }));
        let config = Config::from_lookup(|_| None).unwrap();
        let sources = DataSources::new(Arc::new(ConnectionManager::new(agent.connector())), config.sources);

        assert!(sources.error_logs("checkout", 60).await.unwrap().is_empty());
    }
}
