//! # Sentinel Rollback - Environment-Specific Rollback for the Vista Service
//!
//! When a monitoring session escalates, this crate drives the rollback:
//!
//! - [`DeploymentHistory`]: append-only audit log, source of the previous
//!   known-good version
//! - [`RollbackStrategy`]: polymorphic redeploy mechanics for the three
//!   deployment targets (Render webhook, AWS ECS task-definition
//!   revision, Docker Compose image tag)
//! - [`RollbackOrchestrator`]: resolves the target version, executes the
//!   strategy, verifies recovery through the health probe, records the
//!   outcome, and notifies
//! - [`Notifier`]: best-effort webhook alert on the outcome
//!
//! ## Failure model
//!
//! Strategy and configuration failures are fatal to the attempt and are
//! never retried: rolling back a rollback is an operator decision, not an
//! automated one. History persistence and notification failures are
//! logged and swallowed; they must never alter the rollback's own
//! verdict. A rollback whose mechanics succeeded but whose service never
//! became reachable again is recorded and reported as failed.

pub mod config;
pub mod error;
pub mod history;
pub mod notify;
pub mod orchestrator;
pub mod strategies;

pub use config::RollbackConfig;
pub use error::{RollbackError, RollbackResult};
pub use history::DeploymentHistory;
pub use notify::Notifier;
pub use orchestrator::{RollbackOrchestrator, VerifyConfig};
pub use strategies::{
    for_env, AwsEcsStrategy, ComposeStrategy, RenderStrategy, RollbackStrategy,
};
