use std::env;
use std::path::PathBuf;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: Option<String>) -> Self {
        match raw.unwrap_or_default().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Arguments used by remediation actions that have no real source of truth yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDefaults {
    /// Deployment identifier passed to rollback tools.
    pub rollback_deployment_id: String,
    /// Replica count passed to scale tools.
    pub scale_replicas: u32,
}

/// Settings consumed by the data-source adapters and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Repository used for commits when the caller gives no hint ("owner/repo").
    pub default_repo: String,
    /// Owner used when a repository hint has no `/`.
    pub default_repo_owner: String,
    pub commit_limit: u32,
    pub log_window_minutes: u32,
    /// Base URL for ticket links when upstream records carry none.
    pub ticket_browse_url: String,
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Remote agent tool endpoint. Code paths that need the agent fail with a
    /// configuration error while this is unset.
    pub agent_url: Option<String>,
    pub agent_api_key: Option<String>,
    pub sources: SourceSettings,
    pub actions: ActionDefaults,
    /// Outbound notification webhook. Unset means notifications are skipped.
    pub webhook_url: Option<String>,
    /// Base URL of the dashboard, used for links in notifications.
    pub dashboard_url: String,
    /// Optional JSON snapshot file for the row store.
    pub data_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: get_or("HOST", "0.0.0.0"),
            port: get_or("PORT", "8080").parse()?,
            shutdown_timeout_secs: get_or("SHUTDOWN_TIMEOUT", "5").parse()?,
            agent_url: get("AGENT_MCP_URL"),
            agent_api_key: get("AGENT_API_KEY"),
            sources: SourceSettings {
                default_repo: get_or("DEFAULT_REPO", "archestra-ai/archestra"),
                default_repo_owner: get_or("DEFAULT_REPO_OWNER", "archestra-ai"),
                commit_limit: get_or("COMMIT_LIMIT", "5").parse()?,
                log_window_minutes: get_or("LOG_WINDOW_MINUTES", "60").parse()?,
                ticket_browse_url: get_or("TICKET_BROWSE_URL", "https://jira.example.com/browse")
                    .trim_end_matches('/')
                    .to_string(),
            },
            actions: ActionDefaults {
                rollback_deployment_id: get_or("ROLLBACK_DEPLOYMENT_ID", "latest"),
                scale_replicas: get_or("SCALE_REPLICAS", "5").parse()?,
            },
            webhook_url: get("WEBHOOK_URL"),
            dashboard_url: get_or("DASHBOARD_URL", "http://localhost:3001")
                .trim_end_matches('/')
                .to_string(),
            data_path: get("DATA_PATH").map(PathBuf::from),
            log_format: LogFormat::parse(get("LOG_FORMAT")),
        })
    }
}
