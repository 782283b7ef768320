//! The monitoring session: poll loop, session counters, and escalation.
//!
//! State machine per tick: RUNNING -> {RUNNING, ESCALATED, COMPLETED}.
//! ESCALATED is terminal and signals "roll back now". COMPLETED exists
//! only in bounded mode and carries a PASSED/FAILED verdict.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sentinel_types::RoundResult;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::config::MonitorConfig;
use crate::error::HealthResult;
use crate::evaluator::{HealthEvaluator, RoundEvaluator};

/// Mutable counters owned by one monitoring session.
///
/// Granularity is per-round, not per-check: a round with five failed
/// checks still increments `failed_checks` and `consecutive_failures` by
/// exactly one, so a flaky single sub-check cannot dominate the
/// failure-rate statistic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Rounds executed so far.
    pub total_checks: u64,

    /// Rounds with at least one failed check.
    pub failed_checks: u64,

    /// Immediately-preceding rounds with at least one failed check.
    /// Reset to zero by any clean round.
    pub consecutive_failures: u32,

    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh state with all counters zero.
    pub fn new() -> Self {
        Self {
            total_checks: 0,
            failed_checks: 0,
            consecutive_failures: 0,
            started_at: Utc::now(),
        }
    }

    /// Fold one round into the counters.
    pub fn observe(&mut self, round: &RoundResult) {
        self.total_checks += 1;
        if round.failed_count() > 0 {
            self.failed_checks += 1;
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }
        debug_assert!(self.failed_checks <= self.total_checks);
    }

    /// Failure rate as a truncated integer percentage, the arithmetic the
    /// escalation threshold is compared against.
    pub fn failure_rate_pct(&self) -> u64 {
        if self.total_checks == 0 {
            0
        } else {
            self.failed_checks * 100 / self.total_checks
        }
    }

    /// Exact failure rate as a percentage, carried in reports so the
    /// truncation above stays visible to operators.
    pub fn failure_rate_exact(&self) -> f64 {
        if self.total_checks == 0 {
            0.0
        } else {
            self.failed_checks as f64 * 100.0 / self.total_checks as f64
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-tick decision of the failure classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep monitoring.
    Continue,
    /// Sustained failure: hand off to the rollback orchestrator.
    Escalate,
}

/// Escalation thresholds applied to the session counters each tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Escalate at this many consecutive failed rounds.
    pub max_consecutive_failures: u32,

    /// Escalate when the truncated failure-rate percentage is strictly
    /// greater than this.
    pub failure_rate_threshold_pct: u64,
}

impl EscalationPolicy {
    /// Classify the current session state.
    pub fn verdict(&self, state: &SessionState) -> Verdict {
        if state.consecutive_failures >= self.max_consecutive_failures
            || state.failure_rate_pct() > self.failure_rate_threshold_pct
        {
            Verdict::Escalate
        } else {
            Verdict::Continue
        }
    }
}

impl From<&MonitorConfig> for EscalationPolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            failure_rate_threshold_pct: config.failure_rate_threshold_pct,
        }
    }
}

/// Final verdict of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionVerdict {
    /// Bounded session completed with failure rate within threshold.
    Passed,
    /// Bounded session completed with failure rate over threshold.
    Failed,
    /// Escalation thresholds tripped; rollback is indicated.
    Escalated,
}

/// Serializable summary of one monitoring session, written by the CLI's
/// `--report` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Endpoint (or scripted source) the session monitored.
    pub target: String,

    /// Final verdict.
    pub verdict: SessionVerdict,

    /// Final counters.
    pub state: SessionState,

    /// Truncated failure rate the verdict was decided on.
    pub failure_rate_pct: u64,

    /// Exact failure rate for operator visibility.
    pub failure_rate_exact: f64,

    /// When the session finished.
    pub finished_at: DateTime<Utc>,

    /// Every evaluated round, in order.
    pub rounds: Vec<RoundResult>,
}

impl SessionReport {
    /// Pretty JSON rendering for the report artifact.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Drives the poll loop: evaluate, classify, sleep, repeat.
pub struct MonitoringSession {
    target: String,
    evaluator: Arc<dyn RoundEvaluator>,
    config: MonitorConfig,
}

impl MonitoringSession {
    /// Create a session over any round evaluator.
    pub fn new(
        target: impl Into<String>,
        evaluator: Arc<dyn RoundEvaluator>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            target: target.into(),
            evaluator,
            config,
        }
    }

    /// Create a session probing a live API endpoint.
    pub fn for_endpoint(api_url: &str, config: MonitorConfig) -> HealthResult<Self> {
        let evaluator = HealthEvaluator::new(api_url, config.probe_timeout, config.thresholds)?;
        Ok(Self::new(api_url, Arc::new(evaluator), config))
    }

    /// Run the session to completion.
    ///
    /// Bounded mode terminates either by escalating or by reaching the
    /// configured duration; continuous mode terminates only by
    /// escalating.
    #[instrument(skip(self), fields(target = %self.target))]
    pub async fn run(self) -> SessionReport {
        let policy = EscalationPolicy::from(&self.config);
        let mut state = SessionState::new();
        let mut rounds = Vec::new();
        let clock = Instant::now();

        info!(
            interval_secs = self.config.interval.as_secs(),
            duration_secs = self.config.duration.map(|d| d.as_secs()),
            "Monitoring session started"
        );

        loop {
            let round = self.evaluator.evaluate_round().await;
            state.observe(&round);

            if round.is_clean() {
                info!(
                    round = state.total_checks,
                    failure_rate_pct = state.failure_rate_pct(),
                    "Round clean"
                );
            } else {
                warn!(
                    round = state.total_checks,
                    failed = round.failed_count(),
                    failed_checks = ?round.failed_kinds(),
                    consecutive_failures = state.consecutive_failures,
                    failure_rate_pct = state.failure_rate_pct(),
                    "Round failed"
                );
            }
            rounds.push(round);

            if policy.verdict(&state) == Verdict::Escalate {
                warn!(
                    consecutive_failures = state.consecutive_failures,
                    failure_rate_pct = state.failure_rate_pct(),
                    "Escalation thresholds tripped"
                );
                return self.finish(SessionVerdict::Escalated, state, rounds);
            }

            if let Some(duration) = self.config.duration {
                if clock.elapsed() >= duration {
                    let verdict =
                        if state.failure_rate_pct() <= self.config.failure_rate_threshold_pct {
                            SessionVerdict::Passed
                        } else {
                            SessionVerdict::Failed
                        };
                    return self.finish(verdict, state, rounds);
                }
            }

            sleep(self.config.interval).await;
        }
    }

    fn finish(
        &self,
        verdict: SessionVerdict,
        state: SessionState,
        rounds: Vec<RoundResult>,
    ) -> SessionReport {
        info!(
            verdict = ?verdict,
            total_checks = state.total_checks,
            failed_checks = state.failed_checks,
            "Monitoring session finished"
        );
        SessionReport {
            target: self.target.clone(),
            verdict,
            failure_rate_pct: state.failure_rate_pct(),
            failure_rate_exact: state.failure_rate_exact(),
            finished_at: Utc::now(),
            state,
            rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use sentinel_types::{CheckKind, CheckOutcome};

    use super::*;

    /// Evaluator that replays a fixed script of rounds, then repeats the
    /// last entry forever.
    struct ScriptedEvaluator {
        script: Mutex<Vec<RoundResult>>,
        fallback: RoundResult,
    }

    fn round(failed: usize) -> RoundResult {
        let outcomes = CheckKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                if i < failed {
                    CheckOutcome::fail(*kind, "scripted failure")
                } else {
                    CheckOutcome::pass(*kind)
                }
            })
            .collect();
        RoundResult { outcomes }
    }

    impl ScriptedEvaluator {
        fn new(mut rounds: Vec<RoundResult>) -> Self {
            rounds.reverse();
            Self {
                script: Mutex::new(rounds),
                fallback: round(0),
            }
        }
    }

    #[async_trait]
    impl RoundEvaluator for ScriptedEvaluator {
        async fn evaluate_round(&self) -> RoundResult {
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_millis(1),
            duration: Some(Duration::from_millis(50)),
            ..MonitorConfig::default()
        }
    }

    fn session(rounds: Vec<RoundResult>, config: MonitorConfig) -> MonitoringSession {
        MonitoringSession::new("scripted", Arc::new(ScriptedEvaluator::new(rounds)), config)
    }

    #[test]
    fn consecutive_failures_reset_on_clean_round() {
        let mut state = SessionState::new();
        state.observe(&round(2));
        state.observe(&round(5));
        assert_eq!(state.consecutive_failures, 2);
        state.observe(&round(0));
        assert_eq!(state.consecutive_failures, 0);
        state.observe(&round(1));
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.total_checks, 4);
        assert_eq!(state.failed_checks, 3);
        assert!(state.failed_checks <= state.total_checks);
    }

    #[test]
    fn multi_check_failure_counts_as_one_round() {
        let mut state = SessionState::new();
        state.observe(&round(5));
        assert_eq!(state.failed_checks, 1);
        assert_eq!(state.consecutive_failures, 1);
    }

    #[test]
    fn failure_rate_truncates_toward_zero() {
        let mut state = SessionState::new();
        // 1 failure in 17 rounds: exactly 5.88%, truncates to 5.
        state.observe(&round(1));
        for _ in 0..16 {
            state.observe(&round(0));
        }
        assert_eq!(state.failure_rate_pct(), 5);
        assert!(state.failure_rate_exact() > 5.0);

        // The truncated rate does not exceed a threshold of 5, so the
        // classifier continues even though the exact rate is above it.
        let policy = EscalationPolicy {
            max_consecutive_failures: 3,
            failure_rate_threshold_pct: 5,
        };
        assert_eq!(policy.verdict(&state), Verdict::Continue);
    }

    #[test]
    fn escalates_on_rate_strictly_greater() {
        let policy = EscalationPolicy {
            max_consecutive_failures: 100,
            failure_rate_threshold_pct: 5,
        };

        // 1 failure in 16 rounds: 6.25% truncates to 6 > 5.
        let mut state = SessionState::new();
        state.observe(&round(1));
        for _ in 0..15 {
            state.observe(&round(0));
        }
        assert_eq!(state.failure_rate_pct(), 6);
        assert_eq!(policy.verdict(&state), Verdict::Escalate);
    }

    #[tokio::test]
    async fn escalates_on_third_consecutive_failure_exactly() {
        // Three failing rounds with max_consecutive_failures = 3: the
        // session must escalate on round three, not before, not after.
        let config = MonitorConfig {
            interval: Duration::from_millis(1),
            duration: None,
            // High rate threshold so only the consecutive rule can fire.
            failure_rate_threshold_pct: 100,
            ..MonitorConfig::default()
        };
        let report = session(vec![round(1), round(2), round(1)], config).run().await;

        assert_eq!(report.verdict, SessionVerdict::Escalated);
        assert_eq!(report.state.total_checks, 3);
        assert_eq!(report.state.consecutive_failures, 3);
        assert_eq!(report.rounds.len(), 3);
    }

    #[tokio::test]
    async fn two_failures_then_clean_does_not_escalate() {
        let config = MonitorConfig {
            interval: Duration::from_millis(1),
            duration: Some(Duration::from_millis(30)),
            failure_rate_threshold_pct: 100,
            ..MonitorConfig::default()
        };
        let report = session(vec![round(1), round(1), round(0)], config).run().await;

        assert_ne!(report.verdict, SessionVerdict::Escalated);
        assert_eq!(report.state.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn bounded_clean_session_passes() {
        let report = session(Vec::new(), fast_config()).run().await;
        assert_eq!(report.verdict, SessionVerdict::Passed);
        assert!(report.state.total_checks >= 1);
        assert_eq!(report.state.failed_checks, 0);
    }

    #[tokio::test]
    async fn report_serializes_to_json() {
        let report = session(vec![round(1)], fast_config()).run().await;
        let json = report.to_json().unwrap();
        let back: SessionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.verdict, report.verdict);
        assert_eq!(back.state.total_checks, report.state.total_checks);
    }
}
