//! Outbound incident notifications (Slack-compatible incoming webhook).

use serde_json::json;

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// POST `{text}` to the webhook. Returns whether delivery succeeded.
    ///
    /// Never fails: a missing URL skips delivery and transport or status
    /// errors are logged.
    pub async fn send(&self, text: &str) -> bool {
        let Some(url) = &self.webhook_url else {
            tracing::warn!("WEBHOOK_URL not set, skipping notification");
            return false;
        };

        let response = self
            .client
            .post(url)
            .json(&json!({ "text": text }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("Notification delivered");
                true
            }
            Ok(resp) => {
                tracing::error!(status = %resp.status(), "Notification rejected by webhook");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Notification delivery failed");
                false
            }
        }
    }
}

/// Message announcing a newly opened incident.
pub fn incident_message(title: &str, service: &str, incident_url: &str) -> String {
    format!(
        ":rotating_light: *New Incident Detected*\n*Title:* {}\n*Service:* {}\n\n<{}|View Incident Details>",
        title, service, incident_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    type Inbox = Arc<Mutex<Vec<Value>>>;

    async fn receive(State(inbox): State<Inbox>, Json(body): Json<Value>) -> StatusCode {
        inbox.lock().unwrap().push(body);
        StatusCode::OK
    }

    async fn spawn_webhook(status_ok: bool) -> (String, Inbox) {
        let inbox = Inbox::default();
        let app = if status_ok {
            Router::new().route("/hook", post(receive)).with_state(inbox.clone())
        } else {
            Router::new()
                .route("/hook", post(|| async { StatusCode::FORBIDDEN }))
                .with_state(inbox.clone())
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hook", addr), inbox)
    }

    #[tokio::test]
    async fn test_missing_url_is_silent_skip() {
        let notifier = Notifier::new(None);
        assert!(!notifier.is_configured());
        assert!(!notifier.send("hello").await);
    }

    #[tokio::test]
    async fn test_delivers_text_payload() {
        let (url, inbox) = spawn_webhook(true).await;

        assert!(Notifier::new(Some(url)).send("db is down").await);
        assert_eq!(inbox.lock().unwrap()[0]["text"], "db is down");
    }

    #[tokio::test]
    async fn test_rejected_delivery_returns_false() {
        let (url, _) = spawn_webhook(false).await;
        assert!(!Notifier::new(Some(url)).send("db is down").await);
    }

    #[test]
    fn test_incident_message_links_dashboard() {
        let text = incident_message("DB down", "auth", "http://localhost:3001/incident/42");
        assert!(text.contains("*Service:* auth"));
        assert!(text.ends_with("<http://localhost:3001/incident/42|View Incident Details>"));
    }
}
