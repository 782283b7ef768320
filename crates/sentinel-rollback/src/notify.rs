//! Best-effort webhook notifications for rollback outcomes.
//!
//! Fire-and-forget: absence of a webhook URL is a no-op, and transport
//! failures are logged and swallowed. Notification must never block or
//! fail the rollback it is reporting on.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use sentinel_types::{DeployEnv, DeployStatus};
use tracing::{debug, warn};

/// Sends structured alerts to a Slack-compatible webhook.
pub struct Notifier {
    client: Option<Client>,
    webhook_url: Option<String>,
}

impl Notifier {
    /// Create a notifier. `None` disables notifications entirely.
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = match webhook_url {
            Some(_) => match Client::builder().timeout(Duration::from_secs(10)).build() {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "Failed to build notification client, notifications disabled");
                    None
                }
            },
            None => None,
        };
        Self {
            client,
            webhook_url,
        }
    }

    /// A notifier that never sends anything.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// POST one structured alert. Success ignores the response body;
    /// any failure is logged and swallowed.
    pub async fn notify(&self, environment: DeployEnv, status: DeployStatus, message: &str) {
        let (Some(client), Some(url)) = (&self.client, &self.webhook_url) else {
            debug!("No notification webhook configured, skipping alert");
            return;
        };

        let payload = serde_json::json!({
            "text": format!("[{environment}] rollback {status}: {message}"),
            "environment": environment,
            "status": status,
            "message": message,
            "timestamp": Utc::now(),
        });

        match client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(environment = %environment, status = %status, "Notification sent");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Notification webhook returned non-success");
            }
            Err(e) => {
                warn!(error = %e, "Failed to send notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn posts_structured_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "environment": "aws",
                "status": "success",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(format!("{}/hook", server.uri())));
        notifier
            .notify(DeployEnv::Aws, DeployStatus::Success, "rolled back to v1")
            .await;
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_a_noop() {
        let notifier = Notifier::disabled();
        notifier
            .notify(DeployEnv::Docker, DeployStatus::Failed, "nothing to see")
            .await;
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let server = MockServer::start().await;
        let url = format!("{}/hook", server.uri());
        drop(server);

        let notifier = Notifier::new(Some(url));
        // Must not panic or error; the failure is logged.
        notifier
            .notify(DeployEnv::Render, DeployStatus::Failed, "webhook is down")
            .await;
    }
}
