//! Remediation intents and their dispatch to agent tools.

use crate::config::ActionDefaults;
use crate::error::Result;
use crate::tooling::{Capability, ConnectionManager};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionIntent {
    Rollback,
    Scale,
    Page,
    LogsView,
    Restart,
}

impl ActionIntent {
    /// Accepts both the short intent names and the tool-style names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rollback" | "rollback_deployment" => Some(Self::Rollback),
            "scale" | "scale_service" => Some(Self::Scale),
            "page" | "page_oncall" => Some(Self::Page),
            "logs" | "logs-view" | "logs_view" => Some(Self::LogsView),
            "restart" | "restart_service" => Some(Self::Restart),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rollback => "rollback",
            Self::Scale => "scale",
            Self::Page => "page",
            Self::LogsView => "logs-view",
            Self::Restart => "restart",
        }
    }

    /// Capability searched for before falling back to the literal tool name.
    fn capability(&self) -> Option<Capability> {
        match self {
            Self::Rollback => Some(Capability::ROLLBACK),
            Self::Scale => Some(Capability::SCALE),
            Self::Page | Self::LogsView | Self::Restart => None,
        }
    }

    /// Tool name invoked when no advertised tool matches the capability.
    /// `None` means the intent never reaches the agent.
    fn literal_tool(&self) -> Option<&'static str> {
        match self {
            Self::Rollback => Some("rollback_deployment"),
            Self::Scale => Some("scale_service"),
            Self::Page => Some("page_oncall"),
            Self::Restart => Some("restart_service"),
            Self::LogsView => None,
        }
    }
}

impl fmt::Display for ActionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action is aimed at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceContext {
    pub service: String,
    pub alert_id: Option<String>,
    pub reason: String,
}

impl ServiceContext {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            reason: format!("Incident response for {}", service),
            service,
            alert_id: None,
        }
    }

    pub fn with_alert(mut self, alert_id: Option<String>) -> Self {
        if let Some(id) = &alert_id {
            self.reason = format!("Incident response for alert {}", id);
        }
        self.alert_id = alert_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct ActionDispatcher {
    agent: Arc<ConnectionManager>,
    defaults: ActionDefaults,
}

impl ActionDispatcher {
    pub fn new(agent: Arc<ConnectionManager>, defaults: ActionDefaults) -> Self {
        Self { agent, defaults }
    }

    fn arguments(&self, intent: ActionIntent, target: &ServiceContext) -> Value {
        match intent {
            ActionIntent::Rollback => json!({
                "deploymentId": self.defaults.rollback_deployment_id,
                "service": target.service,
                "reason": target.reason,
            }),
            ActionIntent::Scale => json!({
                "replicas": self.defaults.scale_replicas,
                "service": target.service,
                "reason": target.reason,
            }),
            ActionIntent::Page => json!({
                "urgency": "high",
                "service": target.service,
                "reason": target.reason,
            }),
            ActionIntent::Restart => json!({ "service": target.service }),
            ActionIntent::LogsView => json!({}),
        }
    }

    /// Run `intent` against `target`. Failures are reported in the outcome,
    /// never as an `Err`.
    pub async fn dispatch(&self, intent: ActionIntent, target: &ServiceContext) -> ActionOutcome {
        let Some(literal) = intent.literal_tool() else {
            tracing::info!(intent = %intent, service = %target.service, "Log view requested");
            metrics::counter!("actions_dispatched_total", "intent" => intent.as_str(), "outcome" => "ok")
                .increment(1);
            return ActionOutcome::ok("Log view initialized");
        };

        let keywords = intent.capability().map_or(&[][..], |c| c.keywords);
        let arguments = self.arguments(intent, target);
        let outcome = self.run(keywords, literal, arguments).await;

        let label = if outcome.success { "ok" } else { "failed" };
        metrics::counter!("actions_dispatched_total", "intent" => intent.as_str(), "outcome" => label)
            .increment(1);
        tracing::info!(
            intent = %intent,
            service = %target.service,
            success = outcome.success,
            "Action dispatched"
        );
        outcome
    }

    /// Forward a raw tool request. Names of intents with a capability
    /// (`rollback_deployment`, `scale_service`) resolve through it; any other
    /// name is invoked as given.
    pub async fn dispatch_tool(&self, tool: &str, arguments: Value) -> ActionOutcome {
        let keywords = ActionIntent::parse(tool)
            .and_then(|intent| intent.capability())
            .map_or(&[][..], |c| c.keywords);
        let outcome = self.run(keywords, tool, arguments).await;
        let label = if outcome.success { "ok" } else { "failed" };
        metrics::counter!("actions_dispatched_total", "intent" => "raw", "outcome" => label)
            .increment(1);
        outcome
    }

    async fn run(&self, keywords: &[&str], literal: &str, arguments: Value) -> ActionOutcome {
        match self.invoke(keywords, literal, arguments).await {
            Ok(message) => ActionOutcome::ok(message),
            Err(e) => {
                tracing::error!(tool = literal, error = %e, "Action failed");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    async fn invoke(&self, keywords: &[&str], literal: &str, arguments: Value) -> Result<String> {
        let connection = self.agent.connection().await?;
        let tool = connection
            .registry()
            .resolve(keywords)
            .unwrap_or(literal)
            .to_string();

        tracing::debug!(tool = %tool, literal, "Invoking action tool");
        let raw = connection.invoker().invoke(&tool, arguments).await?;

        Ok(if raw.text.trim().is_empty() {
            format!("{} completed", tool)
        } else {
            raw.text
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::testing::ScriptedAgent;
    use crate::tooling::ToolCallResult;

    fn dispatcher(agent: &ScriptedAgent) -> ActionDispatcher {
        ActionDispatcher::new(
            Arc::new(ConnectionManager::new(agent.connector())),
            ActionDefaults {
                rollback_deployment_id: "latest".into(),
                scale_replicas: 5,
            },
        )
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(ActionIntent::parse("rollback"), Some(ActionIntent::Rollback));
        assert_eq!(ActionIntent::parse("page_oncall"), Some(ActionIntent::Page));
        assert_eq!(ActionIntent::parse("logs"), Some(ActionIntent::LogsView));
        assert_eq!(ActionIntent::parse("Restart"), Some(ActionIntent::Restart));
        assert_eq!(ActionIntent::parse("delete_everything"), None);
    }

    #[tokio::test]
    async fn test_logs_view_never_contacts_agent() {
        let agent = ScriptedAgent::new(&[]);
        let outcome = dispatcher(&agent)
            .dispatch(ActionIntent::LogsView, &ServiceContext::new("api"))
            .await;

        assert_eq!(outcome, ActionOutcome::ok("Log view initialized"));
        assert_eq!(agent.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_rollback_uses_resolved_tool() {
        let agent = ScriptedAgent::new(&["k8s__revert_deployment"]).respond(
            "k8s__revert_deployment",
            ToolCallResult::text("Rolled back api to previous revision"),
        );
        let target = ServiceContext::new("api").with_alert(Some("alert-7".into()));

        let outcome = dispatcher(&agent).dispatch(ActionIntent::Rollback, &target).await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Rolled back api to previous revision");
        let call = &agent.calls()[0];
        assert_eq!(call.tool, "k8s__revert_deployment");
        assert_eq!(call.arguments["deploymentId"], "latest");
        assert_eq!(call.arguments["reason"], "Incident response for alert alert-7");
    }

    #[tokio::test]
    async fn test_unresolved_falls_back_to_literal_name() {
        let agent = ScriptedAgent::new(&["page_oncall"]).respond("page_oncall", ToolCallResult::text(""));

        let outcome = dispatcher(&agent)
            .dispatch(ActionIntent::Page, &ServiceContext::new("payments"))
            .await;

        assert_eq!(outcome, ActionOutcome::ok("page_oncall completed"));
        assert_eq!(agent.calls()[0].arguments["urgency"], "high");
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let agent = ScriptedAgent::new(&["ops__scale_service"]).fail("ops__scale_service", "quota exceeded");

        let outcome = dispatcher(&agent)
            .dispatch(ActionIntent::Scale, &ServiceContext::new("api"))
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("quota exceeded"));
        assert_eq!(agent.calls()[0].arguments["replicas"], 5);
    }

    #[tokio::test]
    async fn test_unknown_literal_tool_reports_agent_error() {
        let agent = ScriptedAgent::new(&[]);

        let outcome = dispatcher(&agent)
            .dispatch(ActionIntent::Restart, &ServiceContext::new("api"))
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("Unknown tool: restart_service"));
    }

    #[tokio::test]
    async fn test_dispatch_tool_resolves_capability_names() {
        let agent = ScriptedAgent::new(&["observability__query_logs", "k8s__rollback"])
            .respond("k8s__rollback", ToolCallResult::text("rolled back"));

        let outcome = dispatcher(&agent)
            .dispatch_tool("rollback_deployment", json!({ "service": "api" }))
            .await;

        assert_eq!(outcome, ActionOutcome::ok("rolled back"));
        assert_eq!(agent.calls()[0].tool, "k8s__rollback");
    }

    #[tokio::test]
    async fn test_dispatch_tool_invokes_other_names_literally() {
        let agent = ScriptedAgent::new(&["observability__query_logs", "k8s__rollback"])
            .respond_json("observability__query_logs", json!([]));

        let outcome = dispatcher(&agent).dispatch_tool("logs", json!({})).await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("Unknown tool: logs"));
        let tools: Vec<String> = agent.calls().into_iter().map(|c| c.tool).collect();
        assert_eq!(tools, vec!["logs".to_string()]);
    }
}
