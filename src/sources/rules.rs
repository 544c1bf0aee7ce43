//! Field extraction tables for upstream records.
//!
//! Each normalized field has an ordered list of JSON pointer paths tried
//! first-match-wins, and a fallback used when none of them yields a usable
//! value. Usable means a non-blank string or a number.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// What to substitute when no path matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Literal(&'static str),
    /// Current UTC time, RFC 3339.
    Now,
    /// A value supplied by the caller for this record (e.g. the requested service).
    Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub paths: &'static [&'static str],
    pub fallback: Fallback,
}

impl FieldRule {
    pub const fn new(field: &'static str, paths: &'static [&'static str], fallback: Fallback) -> Self {
        Self {
            field,
            paths,
            fallback,
        }
    }

    /// First usable value among `paths`, if any.
    pub fn first_match(&self, record: &Value) -> Option<String> {
        self.paths
            .iter()
            .filter_map(|path| record.pointer(path))
            .find_map(usable)
    }

    /// Extract the field, substituting the fallback. `request` is used only by
    /// [`Fallback::Request`].
    pub fn extract(&self, record: &Value, request: &str) -> String {
        self.first_match(record).unwrap_or_else(|| match self.fallback {
            Fallback::Literal(value) => value.to_string(),
            Fallback::Now => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            Fallback::Request => request.to_string(),
        })
    }
}

fn usable(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
