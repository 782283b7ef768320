//! Rollback orchestration: resolve, execute, verify, record, notify.

use std::time::{Duration, Instant};

use sentinel_health::HealthProbe;
use sentinel_types::{DeployEnv, DeployStatus, DeploymentRecord, RollbackOutcome};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::config::RollbackConfig;
use crate::error::{RollbackError, RollbackResult};
use crate::history::DeploymentHistory;
use crate::notify::Notifier;
use crate::strategies::{self, RollbackStrategy};

/// Bounds on the post-rollback health verification loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Maximum probe attempts before declaring verification timed out.
    pub max_attempts: u32,

    /// Delay between attempts.
    #[serde(with = "duration_secs")]
    pub delay: Duration,

    /// Per-probe timeout.
    #[serde(with = "duration_secs")]
    pub probe_timeout: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives one rollback attempt end to end.
///
/// The orchestrator owns everything the strategies don't: resolving the
/// target version, verifying user-visible recovery, recording the audit
/// record, and notifying. Strategy failures are not retried; rolling
/// back a rollback is an operator decision, to avoid flapping.
pub struct RollbackOrchestrator {
    config: RollbackConfig,
    history: DeploymentHistory,
    notifier: Notifier,
    verify: VerifyConfig,
    probe: HealthProbe,
}

impl RollbackOrchestrator {
    /// Create an orchestrator probing `api_url` for recovery.
    pub fn new(
        api_url: &str,
        config: RollbackConfig,
        history: DeploymentHistory,
        notifier: Notifier,
        verify: VerifyConfig,
    ) -> RollbackResult<Self> {
        let probe = HealthProbe::new(api_url, verify.probe_timeout)?;
        Ok(Self {
            config,
            history,
            notifier,
            verify,
            probe,
        })
    }

    /// Roll the environment back, building the strategy from configuration.
    pub async fn rollback(
        &self,
        environment: DeployEnv,
        explicit_version: Option<String>,
    ) -> RollbackResult<RollbackOutcome> {
        let strategy = strategies::for_env(environment, &self.config)?;
        self.rollback_with(environment, strategy.as_ref(), explicit_version)
            .await
    }

    /// Roll the environment back using a caller-provided strategy.
    #[instrument(skip(self, strategy), fields(environment = %environment, strategy = strategy.name()))]
    pub async fn rollback_with(
        &self,
        environment: DeployEnv,
        strategy: &dyn RollbackStrategy,
        explicit_version: Option<String>,
    ) -> RollbackResult<RollbackOutcome> {
        let started = Instant::now();

        // 1. Resolve the target version, failing closed when unknown.
        let target_version = match explicit_version {
            Some(version) => version,
            None => self
                .history
                .previous_version(environment)
                .ok_or(RollbackError::NoTargetVersion(environment))?,
        };
        info!(target_version = %target_version, "Starting rollback");

        // 2. Execute the strategy. One shot, no retry.
        if let Err(e) = strategy.execute(&target_version).await {
            warn!(error = %e, "Rollback strategy failed");
            self.history.append(&DeploymentRecord::now(
                environment,
                &target_version,
                DeployStatus::Failed,
            ));
            self.notifier
                .notify(
                    environment,
                    DeployStatus::Failed,
                    &format!("rollback to {target_version} failed: {e}"),
                )
                .await;
            return Err(e);
        }

        // 3. Verify recovery through the health probe.
        let attempts_used = self.verify_recovery().await;
        let verified = attempts_used.is_some();
        let message = match attempts_used {
            Some(n) => format!(
                "rolled back to {target_version}; health verified after {n} probe attempt(s)"
            ),
            None => format!(
                "rolled back to {target_version}, but the service did not recover within {} probe attempts",
                self.verify.max_attempts
            ),
        };

        let outcome = RollbackOutcome {
            environment,
            target_version: target_version.clone(),
            verified,
            duration: started.elapsed(),
            message,
        };

        // 4. Record and notify; neither can change the verdict.
        self.history.append(&DeploymentRecord::now(
            environment,
            &target_version,
            outcome.status(),
        ));
        self.notifier
            .notify(environment, outcome.status(), &outcome.message)
            .await;

        if verified {
            info!(duration_secs = outcome.duration.as_secs(), "Rollback verified");
        } else {
            warn!(
                attempts = self.verify.max_attempts,
                "Rollback applied but recovery never observed"
            );
        }
        Ok(outcome)
    }

    /// Bounded verification loop: up to `max_attempts` probes, `delay`
    /// apart, succeeding on the first reachable response. Returns the
    /// attempt number that succeeded.
    async fn verify_recovery(&self) -> Option<u32> {
        for attempt in 1..=self.verify.max_attempts {
            let snapshot = self.probe.probe().await;
            if snapshot.reachable {
                info!(attempt, "Service reachable after rollback");
                return Some(attempt);
            }
            info!(
                attempt,
                max_attempts = self.verify.max_attempts,
                "Service not yet reachable"
            );
            if attempt < self.verify.max_attempts {
                sleep(self.verify.delay).await;
            }
        }
        None
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
