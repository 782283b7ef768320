//! # Sentinel Health - Monitoring for the Vista Service
//!
//! This crate watches one deployed Vista API endpoint and decides, with
//! explicit quantitative thresholds, whether the deployment is healthy.
//!
//! ## Key Components
//!
//! - [`HealthProbe`]: one GET against `/health`; failure is data, not an error
//! - [`MetricsReader`]: one GET against `/metrics`; absent metrics default to zero
//! - [`HealthEvaluator`]: runs the five checks of a monitoring round
//! - [`SessionState`] / [`EscalationPolicy`]: consecutive-failure and
//!   failure-rate tracking across a session
//! - [`MonitoringSession`]: the poll loop, fixed-interval or bounded-duration
//!
//! ## Failure model
//!
//! The controller's whole purpose is to tolerate a dead target, so probe
//! and metrics failures never surface as `Err`: a dead `/health` endpoint
//! becomes a failed reachability check, missing metrics become zeroes
//! that can never exceed a threshold. The only errors this crate returns
//! are local ones (building an HTTP client).
//!
//! ## Example
//!
//! ```rust,no_run
//! use sentinel_health::{MonitorConfig, MonitoringSession, SessionVerdict};
//!
//! # async fn example() -> Result<(), sentinel_health::HealthError> {
//! let config = MonitorConfig::default();
//! let session = MonitoringSession::for_endpoint("https://vista.example.com", config)?;
//! let report = session.run().await;
//!
//! match report.verdict {
//!     SessionVerdict::Passed => println!("deployment healthy"),
//!     SessionVerdict::Failed => println!("failure rate over threshold"),
//!     SessionVerdict::Escalated => println!("sustained failure, roll back"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod probe;
pub mod session;

pub use config::{CheckThresholds, MonitorConfig};
pub use error::{HealthError, HealthResult};
pub use evaluator::{HealthEvaluator, RoundEvaluator};
pub use metrics::{MetricsReader, MetricsSnapshot};
pub use probe::{HealthProbe, HealthSnapshot};
pub use session::{
    EscalationPolicy, MonitoringSession, SessionReport, SessionState, SessionVerdict, Verdict,
};
