use crate::error::Result;
use crate::incident::model::Ticket;
use crate::sources::rules::{Fallback, FieldRule};
use crate::sources::DataSources;
use crate::tooling::Capability;
use serde_json::{json, Value};

const COLLECTION_KEYS: &[&str] = &["issues", "items"];

pub const TICKET_ID: FieldRule = FieldRule::new("id", &["/id"], Fallback::Literal("unknown"));
pub const TICKET_KEY: FieldRule = FieldRule::new("key", &["/key"], Fallback::Literal("unknown"));
pub const TICKET_SUMMARY: FieldRule = FieldRule::new(
    "summary",
    &["/fields/summary", "/summary"],
    Fallback::Literal("No summary"),
);
pub const TICKET_STATUS: FieldRule = FieldRule::new(
    "status",
    &["/fields/status/name", "/status"],
    Fallback::Literal("Unknown"),
);
pub const TICKET_ASSIGNEE: FieldRule = FieldRule::new(
    "assignee",
    &["/fields/assignee/displayName", "/assignee"],
    Fallback::Literal("Unassigned"),
);
/// Falls back to `<browse base>/<key>`.
pub const TICKET_URL: FieldRule = FieldRule::new("url", &["/html_url", "/url"], Fallback::Request);

pub fn normalize_ticket(record: &Value, browse_url: &str) -> Ticket {
    let key = TICKET_KEY.extract(record, "");
    let default_url = format!("{}/{}", browse_url, key);
    Ticket {
        id: TICKET_ID.extract(record, ""),
        summary: TICKET_SUMMARY.extract(record, ""),
        status: TICKET_STATUS.extract(record, ""),
        assignee: TICKET_ASSIGNEE.extract(record, ""),
        url: TICKET_URL.extract(record, &default_url),
        key,
    }
}

/// JQL full-text clause for `query`.
fn text_jql(query: &str) -> String {
    format!("text ~ \"{}\"", query.replace('\\', "\\\\").replace('"', "\\\""))
}

impl DataSources {
    /// Tickets matching `query`.
    pub async fn search_tickets(&self, query: &str) -> Result<Vec<Ticket>> {
        let arguments = json!({
            "jql": text_jql(query),
            "query": query,
        });

        let records = self
            .fetch_records(&Capability::TICKETS, COLLECTION_KEYS, arguments)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, query, "Searching tickets failed");
                e
            })?;

        let browse_url = &self.settings().ticket_browse_url;
        Ok(records
            .iter()
            .map(|r| normalize_ticket(r, browse_url))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tooling::testing::ScriptedAgent;
    use crate::tooling::ConnectionManager;
    use std::sync::Arc;

    const BROWSE: &str = "https://jira.example.com/browse";

    #[test]
    fn test_normalize_jira_shape() {
        let ticket = normalize_ticket(
            &json!({
                "id": "1001",
                "key": "OPS-1234",
                "fields": {
                    "summary": "Database latency spikes during backup",
                    "status": { "name": "In Progress" },
                    "assignee": { "displayName": "db_admin" }
                }
            }),
            BROWSE,
        );

        assert_eq!(ticket.key, "OPS-1234");
        assert_eq!(ticket.status, "In Progress");
        assert_eq!(ticket.assignee, "db_admin");
        assert_eq!(ticket.url, "https://jira.example.com/browse/OPS-1234");
    }

    #[test]
    fn test_normalize_defaults() {
        let ticket = normalize_ticket(&json!({ "key": "SEC-9", "fields": { "assignee": null } }), BROWSE);

        assert_eq!(ticket.id, "unknown");
        assert_eq!(ticket.summary, "No summary");
        assert_eq!(ticket.status, "Unknown");
        assert_eq!(ticket.assignee, "Unassigned");
    }

    #[test]
    fn test_jql_escapes_quotes() {
        assert_eq!(text_jql(r#"say "hi""#), r#"text ~ "say \"hi\"""#);
    }

    #[tokio::test]
    async fn test_search_tickets_unwraps_issues() {
        let agent = ScriptedAgent::new(&["atlassian__jira_search"]).respond_json(
            "atlassian__jira_search",
            json!({ "total": 1, "issues": [{ "id": 7, "key": "PROD-567", "summary": "timeouts" }] }),
        );
        let config = Config::from_lookup(|_| None).unwrap();
        let sources = DataSources::new(Arc::new(ConnectionManager::new(agent.connector())), config.sources);

        let tickets = sources.search_tickets("timeout").await.unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].id, "7");
        assert_eq!(tickets[0].summary, "timeouts");
        assert_eq!(agent.calls()[0].arguments["jql"], "text ~ \"timeout\"");
    }
}
