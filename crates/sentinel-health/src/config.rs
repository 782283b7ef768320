//! Monitoring session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Thresholds a monitoring round is evaluated against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckThresholds {
    /// Maximum acceptable error rate, in percent. The metrics endpoint
    /// reports a 0..1 fraction; the check fails when
    /// `error_rate * 100 > error_rate_pct`.
    pub error_rate_pct: f64,

    /// Maximum acceptable p95 response time, in milliseconds.
    pub response_time_ms: f64,
}

impl Default for CheckThresholds {
    fn default() -> Self {
        Self {
            error_rate_pct: 5.0,
            response_time_ms: 1000.0,
        }
    }
}

/// Configuration for one monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between monitoring rounds.
    #[serde(with = "duration_secs")]
    pub interval: Duration,

    /// Total session duration for bounded mode. `None` runs the session
    /// continuously; it then terminates only by escalating.
    #[serde(default, with = "opt_duration_secs")]
    pub duration: Option<Duration>,

    /// Timeout for each health probe. Kept short since it runs every tick.
    #[serde(with = "duration_secs")]
    pub probe_timeout: Duration,

    /// Per-round check thresholds.
    #[serde(default)]
    pub thresholds: CheckThresholds,

    /// Escalate after this many consecutive failed rounds.
    pub max_consecutive_failures: u32,

    /// Escalate when the truncated-integer failure rate exceeds this
    /// percentage (strictly greater).
    pub failure_rate_threshold_pct: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            duration: Some(Duration::from_secs(300)),
            probe_timeout: Duration::from_secs(10),
            thresholds: CheckThresholds::default(),
            max_consecutive_failures: 3,
            failure_rate_threshold_pct: 5,
        }
    }
}

impl MonitorConfig {
    /// A continuous session with otherwise default settings.
    pub fn continuous() -> Self {
        Self {
            duration: None,
            ..Self::default()
        }
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

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
