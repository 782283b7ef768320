//! Deployment environments, audit records, and rollback outcomes.
//!
//! A [`DeploymentRecord`] is one line of the append-only deployment
//! history log. Records are never mutated or deleted; readers only scan.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deployment target environment.
///
/// The set is closed: dispatching a rollback over this enum is exhaustive
/// at compile time, so an unknown environment cannot silently fall through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEnv {
    /// Render web service (rollback via deploy-trigger webhook).
    Render,
    /// AWS ECS service (rollback via task-definition revision).
    Aws,
    /// Docker Compose stack (rollback via image tag rewrite).
    Docker,
}

impl DeployEnv {
    /// All environments, in a stable order.
    pub const ALL: [DeployEnv; 3] = [DeployEnv::Render, DeployEnv::Aws, DeployEnv::Docker];

    /// Stable lowercase name used in logs and the history file.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployEnv::Render => "render",
            DeployEnv::Aws => "aws",
            DeployEnv::Docker => "docker",
        }
    }
}

impl fmt::Display for DeployEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployEnv {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "render" => Ok(DeployEnv::Render),
            "aws" => Ok(DeployEnv::Aws),
            "docker" => Ok(DeployEnv::Docker),
            other => Err(ParseRecordError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Outcome status of a deployment or rollback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    /// The attempt completed and recovery was verified.
    Success,
    /// The attempt failed or recovery was never observed.
    Failed,
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStatus::Success => f.write_str("success"),
            DeployStatus::Failed => f.write_str("failed"),
        }
    }
}

impl FromStr for DeployStatus {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(DeployStatus::Success),
            "failed" => Ok(DeployStatus::Failed),
            other => Err(ParseRecordError::UnknownStatus(other.to_string())),
        }
    }
}

/// One immutable entry in the deployment history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// When the deployment or rollback attempt completed.
    pub timestamp: DateTime<Utc>,

    /// Target environment.
    pub environment: DeployEnv,

    /// Deployed version. Opaque: an image tag, commit SHA, or
    /// task-definition revision depending on the environment.
    pub version: String,

    /// Outcome of the attempt.
    pub status: DeployStatus,
}

impl DeploymentRecord {
    /// Create a record stamped with the current time.
    pub fn now(environment: DeployEnv, version: impl Into<String>, status: DeployStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            environment,
            version: version.into(),
            status,
        }
    }

    /// Serialize to the on-disk line format:
    /// `timestamp | environment | version | status`.
    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.timestamp.to_rfc3339(),
            self.environment,
            self.version,
            self.status
        )
    }

    /// Parse one history line. The inverse of [`to_line`](Self::to_line).
    pub fn parse_line(line: &str) -> Result<Self, ParseRecordError> {
        let mut fields = line.split('|').map(str::trim);

        let timestamp = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(ParseRecordError::MissingField("timestamp"))?;
        let environment = fields
            .next()
            .ok_or(ParseRecordError::MissingField("environment"))?;
        let version = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(ParseRecordError::MissingField("version"))?;
        let status = fields
            .next()
            .ok_or(ParseRecordError::MissingField("status"))?;

        if fields.next().is_some() {
            return Err(ParseRecordError::TrailingFields);
        }

        Ok(Self {
            timestamp: DateTime::parse_from_rfc3339(timestamp)
                .map_err(|e| ParseRecordError::BadTimestamp(e.to_string()))?
                .with_timezone(&Utc),
            environment: environment.parse()?,
            version: version.to_string(),
            status: status.parse()?,
        })
    }
}

/// Error parsing a deployment history line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRecordError {
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid timestamp: {0}")]
    BadTimestamp(String),

    #[error("trailing fields after status")]
    TrailingFields,
}

/// Summary of one completed rollback attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOutcome {
    /// Environment the rollback targeted.
    pub environment: DeployEnv,

    /// Version the environment was rolled back to.
    pub target_version: String,

    /// Whether post-rollback health verification succeeded.
    ///
    /// A rollback whose mechanics succeeded but whose service never came
    /// back is not a success; user-observable recovery is the only
    /// definition that matters.
    pub verified: bool,

    /// Wall-clock duration of the whole attempt, verification included.
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// Human-readable summary for notifications and logs.
    pub message: String,
}

impl RollbackOutcome {
    /// Status to record and notify for this outcome.
    pub fn status(&self) -> DeployStatus {
        if self.verified {
            DeployStatus::Success
        } else {
            DeployStatus::Failed
        }
    }
}

/// Serde helper: Duration as whole seconds.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_round_trip() {
        for env in DeployEnv::ALL {
            assert_eq!(env.as_str().parse::<DeployEnv>().unwrap(), env);
        }
        assert!("kubernetes".parse::<DeployEnv>().is_err());
    }

    #[test]
    fn record_line_round_trip() {
        let record = DeploymentRecord::now(DeployEnv::Aws, "v1.4.2", DeployStatus::Success);
        let parsed = DeploymentRecord::parse_line(&record.to_line()).unwrap();
        assert_eq!(parsed.environment, DeployEnv::Aws);
        assert_eq!(parsed.version, "v1.4.2");
        assert_eq!(parsed.status, DeployStatus::Success);
        assert_eq!(parsed.timestamp, record.timestamp);
    }

    #[test]
    fn parse_line_rejects_garbage() {
        assert!(DeploymentRecord::parse_line("").is_err());
        assert!(DeploymentRecord::parse_line("not a record").is_err());
        assert!(
            DeploymentRecord::parse_line("2024-01-01T00:00:00Z | mars | v1 | success").is_err()
        );
        assert!(
            DeploymentRecord::parse_line("2024-01-01T00:00:00Z | aws | v1 | maybe").is_err()
        );
        assert!(DeploymentRecord::parse_line(
            "2024-01-01T00:00:00Z | aws | v1 | success | extra"
        )
        .is_err());
    }

    #[test]
    fn parse_line_tolerates_spacing() {
        let parsed =
            DeploymentRecord::parse_line("2024-01-01T00:00:00+00:00|docker|  sha-abc123 |failed")
                .unwrap();
        assert_eq!(parsed.environment, DeployEnv::Docker);
        assert_eq!(parsed.version, "sha-abc123");
        assert_eq!(parsed.status, DeployStatus::Failed);
    }

    #[test]
    fn outcome_status_follows_verification() {
        let mut outcome = RollbackOutcome {
            environment: DeployEnv::Render,
            target_version: "v2".into(),
            verified: true,
            duration: Duration::from_secs(42),
            message: "ok".into(),
        };
        assert_eq!(outcome.status(), DeployStatus::Success);
        outcome.verified = false;
        assert_eq!(outcome.status(), DeployStatus::Failed);
    }
}
