//! Process-wide agent connection with single-flight initialization.
//!
//! The first caller triggers exactly one connect + discovery attempt;
//! concurrent callers await that same attempt. The outcome is cached for the
//! lifetime of the manager: a failed attempt poisons it and every later call
//! fails immediately with the original cause. There is no reconnect.

use crate::error::{AppError, Result};
use crate::tooling::invoker::Invoker;
use crate::tooling::registry::Registry;
use crate::tooling::types::ToolConnector;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Observable state of the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No endpoint configured; agent-backed paths fail with a configuration error.
    Unconfigured,
    Uninitialized,
    Connected,
    Poisoned,
}

/// A live session together with the tools it advertised at connect time.
pub struct AgentConnection {
    registry: Registry,
    invoker: Invoker,
}

impl AgentConnection {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

pub struct ConnectionManager {
    connector: Option<Arc<dyn ToolConnector>>,
    missing_reason: String,
    cell: OnceCell<std::result::Result<Arc<AgentConnection>, String>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn ToolConnector>) -> Self {
        Self {
            connector: Some(connector),
            missing_reason: String::new(),
            cell: OnceCell::new(),
        }
    }

    /// Manager for a process with no agent endpoint configured.
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            connector: None,
            missing_reason: reason.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.connector.is_none() {
            return ConnectionState::Unconfigured;
        }
        match self.cell.get() {
            None => ConnectionState::Uninitialized,
            Some(Ok(_)) => ConnectionState::Connected,
            Some(Err(_)) => ConnectionState::Poisoned,
        }
    }

    /// Return the shared connection, establishing it on first use.
    pub async fn connection(&self) -> Result<Arc<AgentConnection>> {
        let Some(connector) = &self.connector else {
            return Err(AppError::ConfigError(self.missing_reason.clone()));
        };

        let outcome = self
            .cell
            .get_or_init(|| Self::establish(Arc::clone(connector)))
            .await;

        match outcome {
            Ok(connection) => Ok(Arc::clone(connection)),
            Err(cause) => Err(AppError::ConnectionError(format!(
                "{}; restart the service to retry",
                cause
            ))),
        }
    }

    async fn establish(
        connector: Arc<dyn ToolConnector>,
    ) -> std::result::Result<Arc<AgentConnection>, String> {
        tracing::info!("Connecting to agent tool endpoint");

        let attempt = async {
            let session = connector.connect().await?;
            let tools = session.list_tools().await?;
            Ok::<_, AppError>((session, tools))
        };

        match attempt.await {
            Ok((session, tools)) => {
                let registry = Registry::new(tools);
                tracing::info!(
                    count = registry.len(),
                    tools = %registry.names().collect::<Vec<_>>().join(", "),
                    "Connected to agent"
                );
                for (capability, tool) in registry.capability_table() {
                    tracing::debug!(capability, tool = tool.unwrap_or("-"), "Capability resolution");
                }
                Ok(Arc::new(AgentConnection {
                    registry,
                    invoker: Invoker::new(session),
                }))
            }
            Err(e) => {
                tracing::error!(error = %e, "Agent connection failed; connection is now poisoned");
                Err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::registry::Capability;
    use crate::tooling::testing::ScriptedAgent;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connection_is_cached() {
        let agent = ScriptedAgent::new(&["github__list_commits"]);
        let manager = ConnectionManager::new(agent.connector());
        assert_eq!(manager.state(), ConnectionState::Uninitialized);

        let first = manager.connection().await.unwrap();
        let second = manager.connection().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(agent.connect_count(), 1);
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(
            first.registry().lookup(&Capability::COMMITS),
            Some("github__list_commits")
        );
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_share_one_attempt() {
        let agent = ScriptedAgent::new(&["get_logs"]).connect_delay(Duration::from_millis(50));
        let manager = ConnectionManager::new(agent.connector());

        let (a, b, c) = tokio::join!(
            manager.connection(),
            manager.connection(),
            manager.connection()
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(agent.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_poisons_without_retry() {
        let agent = ScriptedAgent::new(&[]).refuse_connections("connection refused");
        let manager = ConnectionManager::new(agent.connector());

        let err = manager.connection().await.err().unwrap();
        assert!(matches!(err, AppError::ConnectionError(_)));
        assert_eq!(manager.state(), ConnectionState::Poisoned);

        let (a, b) = tokio::join!(manager.connection(), manager.connection());
        for result in [a, b] {
            match result {
                Err(e) => assert!(e.to_string().contains("connection refused")),
                Ok(_) => panic!("poisoned manager must not connect"),
            }
        }
        assert_eq!(agent.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_is_config_error_and_not_cached() {
        let manager = ConnectionManager::unconfigured("AGENT_MCP_URL is not set");

        for _ in 0..2 {
            let err = manager.connection().await.err().unwrap();
            assert!(matches!(err, AppError::ConfigError(ref m) if m.contains("AGENT_MCP_URL")));
        }
        assert_eq!(manager.state(), ConnectionState::Unconfigured);
    }
}
