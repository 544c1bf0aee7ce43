use crate::error::{AppError, Result};
use crate::incident::actions::{ActionDispatcher, ActionIntent, ActionOutcome, ServiceContext};
use crate::incident::aggregator::{load_evidence, ContextAggregator};
use crate::incident::model::IncidentReport;
use crate::incident::report::synthesize;
use crate::notify::{incident_message, Notifier};
use crate::persistence::{row, Direction, Filter, Query, Row, RowStore, Table};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Request to open an incident.
#[derive(Debug, Clone, Default)]
pub struct NewIncident {
    pub title: String,
    pub service: String,
    pub error_keyword: String,
    pub repo: Option<String>,
}

impl NewIncident {
    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("service", &self.service),
            ("errorKeyword", &self.error_keyword),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedIncident {
    pub incident_id: String,
    pub report: IncidentReport,
    pub notified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentDetails {
    pub incident: Row,
    pub report: Option<Row>,
    /// Latest evidence collection per source type.
    pub evidence: HashMap<String, Value>,
}

/// Incident lifecycle on top of the row store.
#[derive(Clone)]
pub struct IncidentWorkflow {
    store: Arc<dyn RowStore>,
    aggregator: ContextAggregator,
    dispatcher: ActionDispatcher,
    notifier: Notifier,
    dashboard_url: String,
}

impl IncidentWorkflow {
    pub fn new(
        store: Arc<dyn RowStore>,
        aggregator: ContextAggregator,
        dispatcher: ActionDispatcher,
        notifier: Notifier,
        dashboard_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            aggregator,
            dispatcher,
            notifier,
            dashboard_url: dashboard_url.into(),
        }
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Record a new incident, analyze it and announce it.
    pub async fn open(&self, request: NewIncident) -> Result<OpenedIncident> {
        request.validate()?;

        let stored = self
            .store
            .insert(
                Table::Incidents,
                vec![row(json!({
                    "title": request.title,
                    "description": format!("Alert from {}: {}", request.service, request.error_keyword),
                    "status": "open",
                    "service": request.service,
                    "error_keyword": request.error_keyword,
                    "repo": request.repo,
                }))],
            )
            .await?;
        let incident_id = stored
            .first()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::StorageError("Inserted incident has no id".into()))?;

        metrics::counter!("incidents_created_total").increment(1);
        tracing::info!(incident_id = %incident_id, service = %request.service, "Incident opened");

        let report = self
            .run_analysis(
                &incident_id,
                &request.service,
                &request.error_keyword,
                request.repo.as_deref(),
            )
            .await?;

        let link = format!("{}/incident/{}", self.dashboard_url, incident_id);
        let notified = self
            .notifier
            .send(&incident_message(&request.title, &request.service, &link))
            .await;

        Ok(OpenedIncident {
            incident_id,
            report,
            notified,
        })
    }

    /// Rebuild context and report for an existing incident, replacing the
    /// previous report.
    pub async fn analyze(&self, incident_id: &str) -> Result<IncidentReport> {
        let incident = self.incident(incident_id).await?;
        let text = |column: &str| {
            incident
                .get(column)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let (service, keyword) = (text("service"), text("error_keyword"));
        if service.is_empty() || keyword.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Incident {} has no service or error keyword to analyze",
                incident_id
            )));
        }
        let repo = incident.get("repo").and_then(Value::as_str);

        self.run_analysis(incident_id, &service, &keyword, repo).await
    }

    async fn run_analysis(
        &self,
        incident_id: &str,
        service: &str,
        keyword: &str,
        repo: Option<&str>,
    ) -> Result<IncidentReport> {
        let started = Instant::now();

        let context = self.aggregator.build(incident_id, service, keyword, repo).await?;
        let report = synthesize(&context);
        self.save_report(incident_id, &report).await?;

        metrics::histogram!("incident_analysis_latency_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(
            incident_id,
            actions = report.suggested_actions.len(),
            "Incident report generated"
        );
        Ok(report)
    }

    /// One report per incident: update in place when present.
    async fn save_report(&self, incident_id: &str, report: &IncidentReport) -> Result<()> {
        let patch = row(json!({
            "summary": report.summary,
            "suggested_actions": report.suggested_actions,
        }));

        let updated = self
            .store
            .update(
                Table::IncidentReports,
                patch.clone(),
                Filter::new().eq("incident_id", incident_id),
            )
            .await?;

        if updated == 0 {
            let mut fresh = patch;
            fresh.insert("incident_id".into(), json!(incident_id));
            self.store.insert(Table::IncidentReports, vec![fresh]).await?;
        }
        Ok(())
    }

    async fn incident(&self, incident_id: &str) -> Result<Row> {
        self.store
            .select(Table::Incidents, Query::new().eq("id", incident_id).limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("incident {}", incident_id)))
    }

    /// All incidents, newest first.
    pub async fn list(&self) -> Result<Vec<Row>> {
        self.store
            .select(
                Table::Incidents,
                Query::new().order_by("created_at", Direction::Descending),
            )
            .await
    }

    pub async fn details(&self, incident_id: &str) -> Result<IncidentDetails> {
        let incident = self.incident(incident_id).await?;
        let report = self
            .store
            .select(
                Table::IncidentReports,
                Query::new().eq("incident_id", incident_id).limit(1),
            )
            .await?
            .into_iter()
            .next();
        let evidence = load_evidence(self.store.as_ref(), incident_id).await?;

        Ok(IncidentDetails {
            incident,
            report,
            evidence,
        })
    }

    pub async fn resolve(&self, incident_id: &str) -> Result<Row> {
        let updated = self
            .store
            .update(
                Table::Incidents,
                row(json!({ "status": "resolved" })),
                Filter::new().eq("id", incident_id),
            )
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("incident {}", incident_id)));
        }

        tracing::info!(incident_id, "Incident resolved");
        self.incident(incident_id).await
    }

    /// Dispatch an operator action and record it in `actions_taken`.
    pub async fn execute_action(&self, intent: ActionIntent, target: ServiceContext) -> Result<ActionOutcome> {
        let outcome = self.dispatcher.dispatch(intent, &target).await;
        let status = if outcome.success { "success" } else { "failed" };

        let record = row(json!({
            "alert_id": target.alert_id,
            "action_type": intent.as_str(),
            "status": status,
            "details": {
                "service": target.service,
                "message": outcome.message,
            },
        }));
        self.store.insert(Table::ActionsTaken, vec![record]).await?;

        Ok(outcome)
    }
}
