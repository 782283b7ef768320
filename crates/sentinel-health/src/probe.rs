//! Liveness probe against the service's `/health` endpoint.
//!
//! One probe is one HTTP round trip. A dead, hung, or misbehaving target
//! is the expected case for this controller, so every failure mode folds
//! into `reachable = false` on the snapshot; the probe itself never
//! returns an error to the monitoring loop.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::HealthResult;

/// Component status reported when the service omits a component.
pub const STATUS_UNKNOWN: &str = "unknown";

/// The only component status that passes a component check.
pub const STATUS_HEALTHY: &str = "healthy";

/// Result of one liveness call. Produced fresh each probe, never persisted.
#[derive(Debug, Clone, Default)]
pub struct HealthSnapshot {
    /// Whether `/health` answered with a 2xx within the timeout.
    pub reachable: bool,

    /// Overall status string reported by the service, when present.
    pub status: Option<String>,

    /// Per-component status strings (`database`, `llm`, ...).
    pub components: HashMap<String, String>,

    /// Transport-level failure detail when unreachable.
    pub error: Option<String>,
}

impl HealthSnapshot {
    /// An unreachable snapshot with the given failure detail.
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            status: None,
            components: HashMap::new(),
            error: Some(error.into()),
        }
    }

    /// Status for a named component, defaulting to `"unknown"`.
    pub fn component_status(&self, name: &str) -> &str {
        self.components
            .get(name)
            .map(String::as_str)
            .unwrap_or(STATUS_UNKNOWN)
    }
}

/// Wire shape of the `/health` response body. Extra fields (uptime,
/// message, per-component latency) are ignored.
#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    components: HashMap<String, ComponentBody>,
}

#[derive(Debug, Deserialize)]
struct ComponentBody {
    #[serde(default)]
    status: Option<String>,
}

/// Probe for the service's liveness endpoint.
pub struct HealthProbe {
    client: Client,
    health_url: String,
}

impl HealthProbe {
    /// Create a probe for `{api_url}/health` with the given timeout.
    pub fn new(api_url: &str, timeout: Duration) -> HealthResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            health_url: format!("{}/health", api_url.trim_end_matches('/')),
        })
    }

    /// Issue one liveness round trip.
    ///
    /// Transport errors, timeouts, non-2xx statuses, and unparseable
    /// bodies all yield `reachable = false`; a 2xx with a body we cannot
    /// parse still counts as reachable with no component detail, since
    /// the service did answer.
    pub async fn probe(&self) -> HealthSnapshot {
        let response = match self.client.get(&self.health_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.health_url, error = %e, "Health probe transport failure");
                return HealthSnapshot::unreachable(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.health_url, status = %status, "Health probe non-success status");
            return HealthSnapshot::unreachable(format!("HTTP {status}"));
        }

        let body: HealthBody = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                debug!(url = %self.health_url, error = %e, "Health body unparseable, treating as reachable");
                return HealthSnapshot {
                    reachable: true,
                    ..HealthSnapshot::default()
                };
            }
        };

        let components = body
            .components
            .into_iter()
            .map(|(name, c)| (name, c.status.unwrap_or_else(|| STATUS_UNKNOWN.to_string())))
            .collect();

        HealthSnapshot {
            reachable: true,
            status: body.status,
            components,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe_for(server: &MockServer) -> HealthProbe {
        HealthProbe::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn healthy_body_parses_components() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "uptime_seconds": 1234.5,
                "components": {
                    "database": { "status": "healthy", "response_time_ms": 3.1 },
                    "llm": { "status": "degraded" }
                }
            })))
            .mount(&server)
            .await;

        let snapshot = probe_for(&server).probe().await;
        assert!(snapshot.reachable);
        assert_eq!(snapshot.status.as_deref(), Some("healthy"));
        assert_eq!(snapshot.component_status("database"), "healthy");
        assert_eq!(snapshot.component_status("llm"), "degraded");
    }

    #[tokio::test]
    async fn missing_components_default_to_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy"
            })))
            .mount(&server)
            .await;

        let snapshot = probe_for(&server).probe().await;
        assert!(snapshot.reachable);
        assert_eq!(snapshot.component_status("database"), "unknown");
        assert_eq!(snapshot.component_status("llm"), "unknown");
    }

    #[tokio::test]
    async fn non_success_status_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let snapshot = probe_for(&server).probe().await;
        assert!(!snapshot.reachable);
        assert!(snapshot.components.is_empty());
        assert!(snapshot.error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn dead_endpoint_is_unreachable_not_an_error() {
        // Bind-then-drop leaves a port with nothing listening.
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let probe = HealthProbe::new(&uri, Duration::from_millis(500)).unwrap();
        let snapshot = probe.probe().await;
        assert!(!snapshot.reachable);
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn garbage_body_on_200_still_counts_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let snapshot = probe_for(&server).probe().await;
        assert!(snapshot.reachable);
        assert_eq!(snapshot.component_status("database"), "unknown");
    }
}
