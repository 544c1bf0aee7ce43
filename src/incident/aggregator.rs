use crate::error::{AppError, Result};
use crate::incident::model::{IncidentContext, SourceType};
use crate::persistence::{Direction, Query, Row, RowStore, Table};
use crate::sources::DataSources;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Fans out to every data source for one incident and records the evidence.
#[derive(Clone)]
pub struct ContextAggregator {
    sources: DataSources,
    store: Arc<dyn RowStore>,
}

impl ContextAggregator {
    pub fn new(sources: DataSources, store: Arc<dyn RowStore>) -> Self {
        Self { sources, store }
    }

    /// Gather commits, logs, tickets and chat concurrently.
    ///
    /// All four adapters run to completion. If any of them failed the whole
    /// build fails and nothing is persisted. On success four evidence rows are
    /// written in github, logs, jira, slack order.
    pub async fn build(
        &self,
        incident_id: &str,
        service: &str,
        error_keyword: &str,
        repo_hint: Option<&str>,
    ) -> Result<IncidentContext> {
        let started = Instant::now();
        let settings = self.sources.settings();
        let repo = repo_hint
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(settings.default_repo.as_str());

        tracing::info!(incident_id, service, error_keyword, repo, "Building incident context");

        let (commits, logs, tickets, messages) = tokio::join!(
            self.sources.recent_commits(repo),
            self.sources.error_logs(service, settings.log_window_minutes),
            self.sources.search_tickets(error_keyword),
            self.sources.chat_messages(error_keyword),
        );

        let outcome = commits.and_then(|commits| {
            Ok(IncidentContext {
                commits,
                logs: logs?,
                tickets: tickets?,
                messages: messages?,
            })
        });

        let context = match outcome {
            Ok(context) => context,
            Err(e) => {
                metrics::counter!("context_builds_total", "outcome" => "failed").increment(1);
                tracing::error!(incident_id, error = %e, "Context build failed");
                return Err(e);
            }
        };

        self.persist(incident_id, &context).await?;

        metrics::counter!("context_builds_total", "outcome" => "ok").increment(1);
        tracing::info!(
            incident_id,
            commits = context.commits.len(),
            logs = context.logs.len(),
            tickets = context.tickets.len(),
            messages = context.messages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Incident context built"
        );
        Ok(context)
    }

    async fn persist(&self, incident_id: &str, context: &IncidentContext) -> Result<()> {
        let rows = vec![
            evidence_row(incident_id, SourceType::Github, &context.commits)?,
            evidence_row(incident_id, SourceType::Logs, &context.logs)?,
            evidence_row(incident_id, SourceType::Jira, &context.tickets)?,
            evidence_row(incident_id, SourceType::Slack, &context.messages)?,
        ];
        self.store.insert(Table::IncidentContext, rows).await?;
        Ok(())
    }
}

fn evidence_row<T: Serialize>(incident_id: &str, source: SourceType, items: &[T]) -> Result<Row> {
    let content = serde_json::to_string(items)
        .map_err(|e| AppError::StorageError(format!("Failed to encode {} evidence: {}", source.as_str(), e)))?;

    let mut row = Row::new();
    row.insert("incident_id".into(), json!(incident_id));
    row.insert("source_type".into(), json!(source.as_str()));
    row.insert("content".into(), Value::String(content));
    Ok(row)
}

/// Latest evidence collection per source type for an incident, keyed by
/// source type name. Sources never recorded are absent.
pub async fn load_evidence(store: &dyn RowStore, incident_id: &str) -> Result<HashMap<String, Value>> {
    let rows = store
        .select(
            Table::IncidentContext,
            Query::new()
                .eq("incident_id", incident_id)
                .order_by("created_at", Direction::Ascending),
        )
        .await?;

    let mut latest = HashMap::new();
    for row in rows {
        let Some(source) = row
            .get("source_type")
            .and_then(Value::as_str)
            .and_then(SourceType::parse)
        else {
            continue;
        };
        let decoded = match row.get("content").and_then(Value::as_str) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| e.to_string()),
            None => Err("content is missing or not a string".to_string()),
        };
        let content = decoded.unwrap_or_else(|error| {
            tracing::warn!(
                incident_id,
                source_type = source.as_str(),
                error = %error,
                "Undecodable evidence row, treating as empty"
            );
            Value::Array(Vec::new())
        });
        // Ascending order, so later rows overwrite earlier ones.
        latest.insert(source.as_str().to_string(), content);
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::persistence::{row, MemoryStore};
    use crate::tooling::testing::ScriptedAgent;
    use crate::tooling::ConnectionManager;

    fn aggregator(agent: &ScriptedAgent) -> (ContextAggregator, Arc<MemoryStore>) {
        let config = Config::from_lookup(|_| None).unwrap();
        let sources = DataSources::new(Arc::new(ConnectionManager::new(agent.connector())), config.sources);
        let store = Arc::new(MemoryStore::new());
        (ContextAggregator::new(sources, store.clone()), store)
    }

    fn full_agent() -> ScriptedAgent {
        ScriptedAgent::new(&["github__list_commits", "loki__query_logs", "jira__search_issues"])
            .respond_json(
                "github__list_commits",
                json!([{ "sha": "a1b2c3d4e5", "commit": { "message": "bump pool size", "author": { "name": "jdoe" } } }]),
            )
            .respond_json(
                "loki__query_logs",
                json!({ "logs": [{ "level": "error", "message": "database connection refused" }] }),
            )
            .respond_json("jira__search_issues", json!({ "issues": [{ "key": "OPS-1" }] }))
    }

    #[tokio::test]
    async fn test_build_collects_all_sources() {
        let agent = full_agent();
        let (aggregator, _) = aggregator(&agent);

        let context = aggregator.build("inc-1", "auth-service", "database", None).await.unwrap();

        assert_eq!(context.commits.len(), 1);
        assert_eq!(context.logs[0].service, "auth-service");
        assert_eq!(context.tickets[0].key, "OPS-1");
        assert!(context.messages.is_empty());
    }

    #[tokio::test]
    async fn test_evidence_rows_persisted_in_source_order() {
        let agent = full_agent();
        let (aggregator, store) = aggregator(&agent);

        aggregator.build("inc-1", "auth-service", "database", None).await.unwrap();

        let rows = store
            .select(Table::IncidentContext, Query::new().eq("incident_id", "inc-1"))
            .await
            .unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r["source_type"].as_str().unwrap()).collect();
        assert_eq!(order, vec!["github", "logs", "jira", "slack"]);
        assert_eq!(rows[3]["content"], "[]");

        let evidence = load_evidence(store.as_ref(), "inc-1").await.unwrap();
        assert_eq!(evidence["jira"][0]["key"], "OPS-1");
    }

    #[tokio::test]
    async fn test_one_failing_adapter_fails_the_build() {
        let agent = full_agent().fail("jira__search_issues", "jira is down");
        let (aggregator, store) = aggregator(&agent);

        let err = aggregator
            .build("inc-1", "auth-service", "database", None)
            .await
            .unwrap_err();

        assert!(err.is_invocation_failure());
        // The other adapters still ran to completion.
        assert_eq!(agent.calls().len(), 3);
        let rows = store.select(Table::IncidentContext, Query::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_repo_hint_and_default() {
        let agent = full_agent();
        let (aggregator, _) = aggregator(&agent);

        aggregator.build("inc-1", "api", "oom", Some("acme/payments")).await.unwrap();
        aggregator.build("inc-2", "api", "oom", Some("  ")).await.unwrap();

        let repos: Vec<String> = agent
            .calls()
            .into_iter()
            .filter(|c| c.tool == "github__list_commits")
            .map(|c| format!("{}/{}", c.arguments["owner"].as_str().unwrap(), c.arguments["repo"].as_str().unwrap()))
            .collect();
        assert_eq!(repos, vec!["acme/payments", "archestra-ai/archestra"]);
    }

    #[tokio::test]
    async fn test_degraded_sources_yield_empty_context() {
        let agent = ScriptedAgent::new(&["unrelated_tool"]);
        let (aggregator, _) = aggregator(&agent);

        let context = aggregator.build("inc-1", "api", "oom", None).await.unwrap();

        assert_eq!(context, IncidentContext::default());
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_evidence_reads_as_empty() {
        let store = MemoryStore::new();
        store
            .insert(
                Table::IncidentContext,
                vec![
                    row(json!({ "incident_id": "inc-1", "source_type": "jira", "content": "{not json" })),
                    row(json!({ "incident_id": "inc-1", "source_type": "logs", "content": 42 })),
                ],
            )
            .await
            .unwrap();

        let evidence = load_evidence(&store, "inc-1").await.unwrap();

        assert_eq!(evidence["jira"], json!([]));
        assert_eq!(evidence["logs"], json!([]));
    }
}
