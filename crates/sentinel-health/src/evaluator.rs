//! Round evaluation: the five checks of one monitoring round.

use std::time::Duration;

use async_trait::async_trait;
use sentinel_types::{CheckKind, CheckOutcome, RoundResult};
use tracing::{debug, instrument};

use crate::config::CheckThresholds;
use crate::error::HealthResult;
use crate::metrics::MetricsReader;
use crate::probe::{HealthProbe, HealthSnapshot, STATUS_HEALTHY};

/// Anything that can produce one monitoring round.
///
/// The monitoring session depends on this seam rather than on the HTTP
/// components directly, so session behavior is testable with scripted
/// rounds.
#[async_trait]
pub trait RoundEvaluator: Send + Sync {
    /// Run all checks of one round.
    async fn evaluate_round(&self) -> RoundResult;
}

/// Evaluates a round against a live endpoint: liveness probe, metrics
/// thresholds, and the database/LLM component statuses.
pub struct HealthEvaluator {
    probe: HealthProbe,
    metrics: MetricsReader,
    thresholds: CheckThresholds,
}

impl HealthEvaluator {
    /// Build an evaluator for the given API endpoint.
    pub fn new(
        api_url: &str,
        probe_timeout: Duration,
        thresholds: CheckThresholds,
    ) -> HealthResult<Self> {
        Ok(Self {
            probe: HealthProbe::new(api_url, probe_timeout)?,
            metrics: MetricsReader::new(api_url, probe_timeout)?,
            thresholds,
        })
    }

    fn component_check(kind: CheckKind, name: &str, snapshot: &HealthSnapshot) -> CheckOutcome {
        let status = snapshot.component_status(name);
        if status == STATUS_HEALTHY {
            CheckOutcome::pass(kind)
        } else {
            CheckOutcome::fail(kind, format!("{name} status: {status}"))
        }
    }
}

#[async_trait]
impl RoundEvaluator for HealthEvaluator {
    /// All five checks always execute, in a fixed order, with no
    /// short-circuit: the operator sees the full picture per round even
    /// when the first check already failed.
    #[instrument(skip(self))]
    async fn evaluate_round(&self) -> RoundResult {
        let snapshot = self.probe.probe().await;
        let metrics = self.metrics.read().await;

        let mut outcomes = Vec::with_capacity(CheckKind::ALL.len());

        // 1. Reachability.
        outcomes.push(if snapshot.reachable {
            CheckOutcome::pass(CheckKind::Health)
        } else {
            CheckOutcome::fail(
                CheckKind::Health,
                snapshot
                    .error
                    .clone()
                    .unwrap_or_else(|| "health endpoint unreachable".to_string()),
            )
        });

        // 2. Error rate, compared in percent.
        let error_pct = metrics.error_rate_pct();
        outcomes.push(if error_pct > self.thresholds.error_rate_pct {
            CheckOutcome::fail(
                CheckKind::ErrorRate,
                format!(
                    "error rate {:.1}% exceeds threshold {:.1}%",
                    error_pct, self.thresholds.error_rate_pct
                ),
            )
        } else {
            CheckOutcome::pass(CheckKind::ErrorRate)
        });

        // 3. p95 response time.
        outcomes.push(if metrics.p95_response_time_ms > self.thresholds.response_time_ms {
            CheckOutcome::fail(
                CheckKind::ResponseTime,
                format!(
                    "p95 {:.0}ms exceeds threshold {:.0}ms",
                    metrics.p95_response_time_ms, self.thresholds.response_time_ms
                ),
            )
        } else {
            CheckOutcome::pass(CheckKind::ResponseTime)
        });

        // 4 & 5. Component statuses.
        outcomes.push(Self::component_check(CheckKind::Database, "database", &snapshot));
        outcomes.push(Self::component_check(CheckKind::Llm, "llm", &snapshot));

        let round = RoundResult { outcomes };
        debug!(
            failed = round.failed_count(),
            failed_checks = ?round.failed_kinds(),
            "Round evaluated"
        );
        round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_health(server: &MockServer, db: &str, llm: &str) {
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "components": {
                    "database": { "status": db },
                    "llm": { "status": llm }
                }
            })))
            .mount(server)
            .await;
    }

    async fn mount_metrics(server: &MockServer, error_rate: f64, p95: f64) {
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error_rate": error_rate,
                "p95_response_time_ms": p95
            })))
            .mount(server)
            .await;
    }

    fn evaluator_for(server: &MockServer) -> HealthEvaluator {
        HealthEvaluator::new(
            &server.uri(),
            Duration::from_secs(2),
            CheckThresholds::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn all_green_round_is_clean() {
        let server = MockServer::start().await;
        mount_health(&server, "healthy", "healthy").await;
        mount_metrics(&server, 0.01, 420.0).await;

        let round = evaluator_for(&server).evaluate_round().await;
        assert_eq!(round.outcomes.len(), 5);
        assert_eq!(round.failed_count(), 0);
    }

    // Scenario: error_rate 0.08 against a 5% threshold fails exactly the
    // error-rate check while health/db/llm pass.
    #[tokio::test]
    async fn elevated_error_rate_fails_only_that_check() {
        let server = MockServer::start().await;
        mount_health(&server, "healthy", "healthy").await;
        mount_metrics(&server, 0.08, 100.0).await;

        let round = evaluator_for(&server).evaluate_round().await;
        assert_eq!(round.failed_count(), 1);
        assert_eq!(round.failed_kinds(), vec![CheckKind::ErrorRate]);
        let reason = round.outcomes[1].reason.as_deref().unwrap();
        assert!(reason.contains("8.0%"), "reason was: {reason}");
    }

    #[tokio::test]
    async fn unreachable_target_fails_health_and_components() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let evaluator = HealthEvaluator::new(
            &uri,
            Duration::from_millis(500),
            CheckThresholds::default(),
        )
        .unwrap();
        let round = evaluator.evaluate_round().await;

        // Reachability fails; metrics default to zero so the numeric
        // checks pass; both components read "unknown" and fail.
        assert_eq!(round.outcomes.len(), 5);
        assert_eq!(
            round.failed_kinds(),
            vec![CheckKind::Health, CheckKind::Database, CheckKind::Llm]
        );
    }

    #[tokio::test]
    async fn degraded_component_fails_its_check() {
        let server = MockServer::start().await;
        mount_health(&server, "healthy", "degraded").await;
        mount_metrics(&server, 0.0, 50.0).await;

        let round = evaluator_for(&server).evaluate_round().await;
        assert_eq!(round.failed_kinds(), vec![CheckKind::Llm]);
        assert_eq!(
            round.outcomes[4].reason.as_deref(),
            Some("llm status: degraded")
        );
    }

    #[tokio::test]
    async fn slow_p95_fails_response_time() {
        let server = MockServer::start().await;
        mount_health(&server, "healthy", "healthy").await;
        mount_metrics(&server, 0.0, 1500.0).await;

        let round = evaluator_for(&server).evaluate_round().await;
        assert_eq!(round.failed_kinds(), vec![CheckKind::ResponseTime]);
    }

    #[tokio::test]
    async fn threshold_comparison_is_strictly_greater() {
        let server = MockServer::start().await;
        mount_health(&server, "healthy", "healthy").await;
        // Exactly at both thresholds: 5% and 1000ms pass.
        mount_metrics(&server, 0.05, 1000.0).await;

        let round = evaluator_for(&server).evaluate_round().await;
        assert_eq!(round.failed_count(), 0);
    }
}
