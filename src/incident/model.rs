//! Normalized incident evidence and the report derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Content hash (or a prefix of one). Display key only.
    pub id: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
}

impl LogLevel {
    /// Map an upstream level/severity string. Unknown values count as errors
    /// since logs are fetched by an error-log query.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warn" | "warning" => Self::Warn,
            "info" | "notice" | "debug" | "trace" => Self::Info,
            _ => Self::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user: String,
    pub text: String,
    pub timestamp: String,
    pub channel: String,
}

/// Evidence gathered for one incident. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentContext {
    pub commits: Vec<Commit>,
    pub logs: Vec<LogEntry>,
    pub tickets: Vec<Ticket>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub summary: String,
    pub suggested_actions: Vec<String>,
}

/// Tag of a persisted evidence row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Github,
    Logs,
    Jira,
    Slack,
}

impl SourceType {
    /// Persistence order of evidence rows.
    pub const ORDER: [SourceType; 4] = [
        SourceType::Github,
        SourceType::Logs,
        SourceType::Jira,
        SourceType::Slack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Logs => "logs",
            Self::Jira => "jira",
            Self::Slack => "slack",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|s| s.as_str() == raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), LogLevel::Warn);
        assert_eq!(LogLevel::parse(" info "), LogLevel::Info);
        assert_eq!(LogLevel::parse("fatal"), LogLevel::Error);
        assert_eq!(LogLevel::parse(""), LogLevel::Error);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = IncidentReport {
            summary: "s".into(),
            suggested_actions: vec!["a".into()],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["suggestedActions"][0], "a");
    }

    #[test]
    fn test_source_type_round_trip_names() {
        for source in SourceType::ORDER {
            assert_eq!(SourceType::parse(source.as_str()), Some(source));
        }
        assert_eq!(SourceType::parse("pagerduty"), None);
    }
}
