//! Reader for the service's `/metrics` endpoint.
//!
//! Metrics absence must never itself count as a health failure: the
//! snapshot values are compared against numeric thresholds, and zero
//! never exceeds a threshold. So every failure mode here resolves to the
//! zero-valued snapshot.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::HealthResult;

/// Result of one metrics call. Missing or unparseable fields resolve to
/// zero rather than failing the round.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MetricsSnapshot {
    /// Cumulative error rate as a 0..1 fraction.
    #[serde(default)]
    pub error_rate: f64,

    /// p95 response time in milliseconds.
    #[serde(default)]
    pub p95_response_time_ms: f64,
}

impl MetricsSnapshot {
    /// Error rate as a percentage, the unit thresholds are expressed in.
    pub fn error_rate_pct(&self) -> f64 {
        self.error_rate * 100.0
    }
}

/// Fetches the service's aggregated metrics document.
pub struct MetricsReader {
    client: Client,
    metrics_url: String,
}

impl MetricsReader {
    /// Create a reader for `{api_url}/metrics` with the given timeout.
    pub fn new(api_url: &str, timeout: Duration) -> HealthResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            metrics_url: format!("{}/metrics", api_url.trim_end_matches('/')),
        })
    }

    /// Fetch the current metrics, zero-valued on any failure.
    pub async fn read(&self) -> MetricsSnapshot {
        let response = match self.client.get(&self.metrics_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(url = %self.metrics_url, status = %response.status(), "Metrics fetch non-success, using zero snapshot");
                return MetricsSnapshot::default();
            }
            Err(e) => {
                debug!(url = %self.metrics_url, error = %e, "Metrics fetch failed, using zero snapshot");
                return MetricsSnapshot::default();
            }
        };

        match response.json::<MetricsSnapshot>().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(url = %self.metrics_url, error = %e, "Metrics body unparseable, using zero snapshot");
                MetricsSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reader_for(server: &MockServer) -> MetricsReader {
        MetricsReader::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn parses_known_fields_and_ignores_extras() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_requests": 1042,
                "error_rate": 0.08,
                "p95_response_time_ms": 812.4,
                "p99_response_time_ms": 1920.0
            })))
            .mount(&server)
            .await;

        let snapshot = reader_for(&server).read().await;
        assert_eq!(snapshot.error_rate, 0.08);
        assert_eq!(snapshot.p95_response_time_ms, 812.4);
        assert!((snapshot.error_rate_pct() - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_fields_default_individually() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "p95_response_time_ms": 250.0
            })))
            .mount(&server)
            .await;

        let snapshot = reader_for(&server).read().await;
        assert_eq!(snapshot.error_rate, 0.0);
        assert_eq!(snapshot.p95_response_time_ms, 250.0);
    }

    #[tokio::test]
    async fn transport_failure_yields_zero_snapshot() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let reader = MetricsReader::new(&uri, Duration::from_millis(500)).unwrap();
        let snapshot = reader.read().await;
        assert_eq!(snapshot.error_rate, 0.0);
        assert_eq!(snapshot.p95_response_time_ms, 0.0);
    }

    #[tokio::test]
    async fn malformed_body_yields_zero_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let snapshot = reader_for(&server).read().await;
        assert_eq!(snapshot.error_rate, 0.0);
        assert_eq!(snapshot.p95_response_time_ms, 0.0);
    }
}
