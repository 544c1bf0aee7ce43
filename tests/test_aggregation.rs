//! Integration tests for capability resolution and context aggregation
//! through the public library API.

use incident_desk::{
    incident::ContextAggregator,
    persistence::{MemoryStore, Query, RowStore, Table},
    sources::DataSources,
    tooling::{resolve_tool, testing::ScriptedAgent, ConnectionManager, ConnectionState},
    AppError, Config,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn aggregator(manager: Arc<ConnectionManager>) -> (ContextAggregator, Arc<MemoryStore>) {
    let config = Config::from_lookup(|_| None).expect("default config");
    let store = Arc::new(MemoryStore::new());
    let aggregator = ContextAggregator::new(DataSources::new(manager, config.sources), store.clone());
    (aggregator, store)
}

#[test]
fn test_resolve_prefers_tool_order_over_keyword_order() {
    let tools = ["jira__find_issues", "github__search_issues"];

    // Both tools match some keyword; the first advertised one wins even though
    // its keyword is listed second.
    assert_eq!(
        resolve_tool(tools, &["search_issues", "find_issues"]),
        Some("jira__find_issues")
    );
    assert_eq!(resolve_tool(tools, &["list_commits"]), None);
    assert_eq!(resolve_tool([], &["list_commits"]), None);
}

#[tokio::test]
async fn test_single_failing_adapter_fails_whole_build() {
    let agent = ScriptedAgent::new(&["git__list_commits", "logs__fetch_logs", "jira__search_issues"])
        .respond_json("git__list_commits", json!([{ "sha": "abc" }]))
        .respond_json("jira__search_issues", json!([{ "key": "OPS-9" }]))
        .fail("logs__fetch_logs", "socket hang up");
    let (aggregator, store) = aggregator(Arc::new(ConnectionManager::new(agent.connector())));

    let result = aggregator.build("inc-1", "checkout", "timeout", None).await;

    match result {
        Err(AppError::InvocationError { tool, message }) => {
            assert_eq!(tool, "logs__fetch_logs");
            assert_eq!(message, "socket hang up");
        }
        other => panic!("expected invocation error, got {:?}", other),
    }
    let evidence = store.select(Table::IncidentContext, Query::new()).await.unwrap();
    assert!(evidence.is_empty());
}

#[tokio::test]
async fn test_poisoned_connection_fails_fast_without_reconnecting() {
    let agent = ScriptedAgent::new(&["git__list_commits"])
        .refuse_connections("handshake rejected")
        .connect_delay(Duration::from_millis(20));
    let manager = Arc::new(ConnectionManager::new(agent.connector()));
    let (aggregator, _) = aggregator(Arc::clone(&manager));

    // First build: all four adapters race to connect, one attempt is made.
    let first = aggregator.build("inc-1", "api", "oom", None).await;
    assert!(matches!(first, Err(AppError::ConnectionError(_))));
    assert_eq!(agent.connect_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Poisoned);

    let (a, b) = tokio::join!(manager.connection(), manager.connection());
    for outcome in [a, b] {
        match outcome {
            Err(AppError::ConnectionError(message)) => assert!(message.contains("handshake rejected")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("poisoned manager returned a connection"),
        }
    }
    assert_eq!(agent.connect_count(), 1);
}

#[tokio::test]
async fn test_missing_fields_are_defaulted() {
    let agent = ScriptedAgent::new(&["git__list_commits"])
        .respond_json("git__list_commits", json!([{ "sha": "deadbeef" }]));
    let (aggregator, _) = aggregator(Arc::new(ConnectionManager::new(agent.connector())));

    let context = aggregator.build("inc-1", "api", "oom", Some("acme/api")).await.unwrap();

    let commit = &context.commits[0];
    assert_eq!(commit.author, "Unknown");
    assert_eq!(commit.message, "No message");
    assert_eq!(commit.url, "#");
    assert!(!commit.date.is_empty());
}

#[tokio::test]
async fn test_failed_evidence_write_leaves_no_rows() {
    let agent = ScriptedAgent::new(&["git__list_commits"])
        .respond_json("git__list_commits", json!([{ "sha": "abc" }]));
    let config = Config::from_lookup(|_| None).expect("default config");
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let store = Arc::new(MemoryStore::open(&blocker.join("rows.json")).unwrap());
    let aggregator = ContextAggregator::new(
        DataSources::new(Arc::new(ConnectionManager::new(agent.connector())), config.sources),
        store.clone(),
    );

    let result = aggregator.build("inc-1", "api", "oom", None).await;

    assert!(matches!(result, Err(AppError::StorageError(_))));
    let evidence = store.select(Table::IncidentContext, Query::new()).await.unwrap();
    assert!(evidence.is_empty());
}
