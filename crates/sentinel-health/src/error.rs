//! Error types for the health crate.
//!
//! Observation failures (unreachable endpoint, malformed metrics) are
//! deliberately NOT errors here; they fold into check outcomes. These
//! variants cover only local setup problems.

use thiserror::Error;

/// Result alias for health operations.
pub type HealthResult<T> = Result<T, HealthError>;

/// Errors from the health monitoring components.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// A configuration value is unusable.
    #[error("invalid monitor configuration: {0}")]
    InvalidConfig(String),
}
