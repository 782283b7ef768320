//! Error types for rollback execution.

use std::time::Duration;

use sentinel_types::DeployEnv;
use thiserror::Error;

/// Result alias for rollback operations.
pub type RollbackResult<T> = Result<T, RollbackError>;

/// Errors from rollback resolution, strategy execution, and verification.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// A required environment-specific setting is missing. Fatal to this
    /// attempt only; surfaced to the operator, never retried.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// No explicit target version and fewer than two history records for
    /// the environment. Fails closed rather than guessing a version.
    #[error("no known-good version to roll back to for environment '{0}'")]
    NoTargetVersion(DeployEnv),

    /// The Render rollback webhook could not be triggered.
    #[error("render rollback trigger failed: {0}")]
    TriggerFailed(String),

    /// `describe-services` against the ECS control plane failed.
    #[error("failed to describe ECS service: {0}")]
    DescribeFailed(String),

    /// `update-service` against the ECS control plane failed.
    #[error("failed to update ECS service: {0}")]
    UpdateFailed(String),

    /// The ECS service never reported steady state within the bound.
    #[error("ECS service did not stabilize within {0:?}")]
    StabilizationTimeout(Duration),

    /// The current task definition is already at revision 1 (or lower);
    /// one-step-back rollback has nowhere to go.
    #[error("no prior task definition revision to roll back to (current revision {0})")]
    NoPriorRevision(i64),

    /// The task definition ARN did not carry a parseable `:<revision>`.
    #[error("invalid task definition ARN: {0}")]
    BadTaskDefinitionArn(String),

    /// `docker compose pull` failed; the compose file has been restored.
    #[error("image pull failed: {0}")]
    PullFailed(String),

    /// `docker compose up` failed; the compose file has been restored.
    #[error("compose restart failed: {0}")]
    RestartFailed(String),

    /// Local I/O (compose file read/write).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),

    /// Health probe setup for the verification loop failed.
    #[error("verification probe setup failed: {0}")]
    Probe(#[from] sentinel_health::HealthError),
}
