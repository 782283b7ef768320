//! # Sentinel Types - Shared Domain Types
//!
//! Core type definitions shared by the Vista Sentinel monitoring and
//! rollback crates:
//!
//! - [`DeployEnv`]: the closed set of deployment targets
//! - [`DeploymentRecord`]: immutable audit entry in the deployment history
//! - [`CheckOutcome`] / [`RoundResult`]: result of one monitoring round
//! - [`RollbackOutcome`]: summary of one rollback attempt
//!
//! Everything here is pure data. The monitoring loop lives in
//! `sentinel-health`, the rollback mechanics in `sentinel-rollback`.

pub mod check;
pub mod deployment;

pub use check::{CheckKind, CheckOutcome, RoundResult};
pub use deployment::{
    DeployEnv, DeployStatus, DeploymentRecord, ParseRecordError, RollbackOutcome,
};
