//! Per-round health check outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The five checks that make up one monitoring round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Liveness: the /health endpoint answered with a 2xx.
    Health,
    /// Cumulative error rate against the configured threshold.
    ErrorRate,
    /// p95 response time against the configured threshold.
    ResponseTime,
    /// Database component status reported by the service.
    Database,
    /// LLM provider component status reported by the service.
    Llm,
}

impl CheckKind {
    /// All checks, in evaluation order.
    pub const ALL: [CheckKind; 5] = [
        CheckKind::Health,
        CheckKind::ErrorRate,
        CheckKind::ResponseTime,
        CheckKind::Database,
        CheckKind::Llm,
    ];

    /// Stable name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Health => "health",
            CheckKind::ErrorRate => "error_rate",
            CheckKind::ResponseTime => "response_time",
            CheckKind::Database => "database",
            CheckKind::Llm => "llm",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single named check within a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Which check this is.
    pub kind: CheckKind,

    /// Whether the check passed.
    pub passed: bool,

    /// Human-readable reason, present when the check failed (observed
    /// value vs threshold, component status, transport error).
    pub reason: Option<String>,
}

impl CheckOutcome {
    /// A passing outcome.
    pub fn pass(kind: CheckKind) -> Self {
        Self {
            kind,
            passed: true,
            reason: None,
        }
    }

    /// A failing outcome with a reason for the operator.
    pub fn fail(kind: CheckKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Result of one monitoring round: all five checks, in evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    /// Outcomes in evaluation order. Always exactly five entries when
    /// produced by the evaluator; every check runs even after a failure
    /// so the operator sees the full picture per round.
    pub outcomes: Vec<CheckOutcome>,
}

impl RoundResult {
    /// Number of failed checks in this round, 0..=5.
    ///
    /// Derived from the outcomes rather than stored, so the invariant
    /// `failed_count == |{o : !o.passed}|` holds by construction.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }

    /// True when every check in the round passed.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }

    /// The kinds that failed, in evaluation order.
    pub fn failed_kinds(&self) -> Vec<CheckKind> {
        self.outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(|o| o.kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_count_matches_outcomes() {
        let round = RoundResult {
            outcomes: vec![
                CheckOutcome::pass(CheckKind::Health),
                CheckOutcome::fail(CheckKind::ErrorRate, "8.0% > 5%"),
                CheckOutcome::pass(CheckKind::ResponseTime),
                CheckOutcome::fail(CheckKind::Database, "status: degraded"),
                CheckOutcome::pass(CheckKind::Llm),
            ],
        };
        assert_eq!(round.failed_count(), 2);
        assert!(!round.is_clean());
        assert_eq!(
            round.failed_kinds(),
            vec![CheckKind::ErrorRate, CheckKind::Database]
        );
    }

    #[test]
    fn clean_round_has_zero_failures() {
        let round = RoundResult {
            outcomes: CheckKind::ALL.iter().map(|k| CheckOutcome::pass(*k)).collect(),
        };
        assert_eq!(round.failed_count(), 0);
        assert!(round.is_clean());
    }

    #[test]
    fn check_kind_names_are_stable() {
        let names: Vec<&str> = CheckKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["health", "error_rate", "response_time", "database", "llm"]
        );
    }
}
