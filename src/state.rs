use crate::config::Config;
use crate::error::Result;
use crate::incident::{ActionDispatcher, ContextAggregator, IncidentWorkflow};
use crate::notify::Notifier;
use crate::persistence::{MemoryStore, RowStore};
use crate::sources::DataSources;
use crate::tooling::{ConnectionManager, ConnectionState, HttpConnector, ToolConnector};
use std::sync::Arc;

/// Application state shared across all request handlers.
pub struct AppState {
    pub config: Arc<Config>,
    /// Process-wide agent connection. Established lazily on first use.
    pub agent: Arc<ConnectionManager>,
    pub store: Arc<dyn RowStore>,
    pub workflow: IncidentWorkflow,
}

impl AppState {
    /// Build state from configuration: HTTP agent connector when an endpoint
    /// is configured, row store snapshotted to `DATA_PATH` when set.
    ///
    /// Nothing here touches the network. The agent is contacted on the first
    /// request that needs it.
    pub fn new(config: Config) -> Result<Self> {
        let connector: Option<Arc<dyn ToolConnector>> = config.agent_url.as_ref().map(|url| {
            Arc::new(HttpConnector::new(url.clone(), config.agent_api_key.clone()))
                as Arc<dyn ToolConnector>
        });

        let store: Arc<dyn RowStore> = match &config.data_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using snapshot-backed row store");
                Arc::new(MemoryStore::open(path)?)
            }
            None => {
                tracing::info!("Using in-memory row store");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_parts(config, connector, store))
    }

    /// Assemble state from explicit collaborators.
    pub fn with_parts(
        config: Config,
        connector: Option<Arc<dyn ToolConnector>>,
        store: Arc<dyn RowStore>,
    ) -> Self {
        let agent = Arc::new(match connector {
            Some(connector) => ConnectionManager::new(connector),
            None => {
                tracing::warn!("AGENT_MCP_URL not set, agent-backed operations will fail");
                ConnectionManager::unconfigured("AGENT_MCP_URL is not set")
            }
        });

        let sources = DataSources::new(Arc::clone(&agent), config.sources.clone());
        let aggregator = ContextAggregator::new(sources, Arc::clone(&store));
        let dispatcher = ActionDispatcher::new(Arc::clone(&agent), config.actions.clone());
        let workflow = IncidentWorkflow::new(
            Arc::clone(&store),
            aggregator,
            dispatcher,
            Notifier::new(config.webhook_url.clone()),
            config.dashboard_url.clone(),
        );

        Self {
            config: Arc::new(config),
            agent,
            store,
            workflow,
        }
    }

    /// Ready unless the agent connection has permanently failed.
    pub fn is_ready(&self) -> bool {
        self.agent.state() != ConnectionState::Poisoned
    }
}
