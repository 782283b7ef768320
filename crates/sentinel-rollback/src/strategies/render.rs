//! Rollback via Render's deploy-trigger webhook.
//!
//! Render's webhook model is fire-and-forget: the POST either triggers a
//! deploy or it doesn't, and nothing in the response says which version
//! was applied. The strategy waits a fixed settle period and leaves real
//! verification to the orchestrator's health-check loop.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use super::RollbackStrategy;
use crate::error::{RollbackError, RollbackResult};

/// Strategy for Render-hosted services.
pub struct RenderStrategy {
    client: Client,
    trigger_url: String,
    settle: Duration,
}

impl RenderStrategy {
    /// Create a strategy POSTing to the given deploy-trigger URL, then
    /// sleeping `settle` before returning.
    pub fn new(trigger_url: String, settle: Duration) -> RollbackResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(RollbackError::ClientBuild)?;
        Ok(Self {
            client,
            trigger_url,
            settle,
        })
    }
}

#[async_trait]
impl RollbackStrategy for RenderStrategy {
    #[instrument(skip(self), fields(strategy = "render"))]
    async fn execute(&self, target_version: &str) -> RollbackResult<()> {
        info!(target_version, "Triggering Render rollback deploy");

        let response = self
            .client
            .post(&self.trigger_url)
            .send()
            .await
            .map_err(|e| RollbackError::TriggerFailed(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(RollbackError::TriggerFailed(format!("HTTP {status}")));
        }

        // Render gives no confirmation that target_version was applied;
        // wait out the deploy before the orchestrator starts probing.
        info!(settle_secs = self.settle.as_secs(), "Deploy triggered, waiting settle period");
        sleep(self.settle).await;

        warn!(
            target_version,
            "Render webhook cannot confirm the applied version; relying on health verification"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "render"
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn strategy_for(server: &MockServer) -> RenderStrategy {
        RenderStrategy::new(format!("{}/deploy/hook", server.uri()), Duration::ZERO).unwrap()
    }

    #[tokio::test]
    async fn successful_trigger_returns_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/deploy/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        strategy_for(&server).execute("v1.2.3").await.unwrap();
    }

    #[tokio::test]
    async fn error_status_fails_the_trigger() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/deploy/hook"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = strategy_for(&server).execute("v1.2.3").await.unwrap_err();
        assert!(matches!(err, RollbackError::TriggerFailed(_)));
    }

    #[tokio::test]
    async fn transport_failure_fails_the_trigger() {
        let server = MockServer::start().await;
        let url = format!("{}/deploy/hook", server.uri());
        drop(server);

        let strategy = RenderStrategy::new(url, Duration::ZERO).unwrap();
        let err = strategy.execute("v1.2.3").await.unwrap_err();
        assert!(matches!(err, RollbackError::TriggerFailed(_)));
    }
}
