//! Append-only deployment history log.
//!
//! One line per record: `timestamp | environment | version | status`.
//! The log is best-effort audit, not a consistency-critical store:
//! append failures are logged and swallowed, and malformed lines are
//! skipped on read. At most one process appends at a time; serializing
//! concurrent invocations is the caller's job.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use sentinel_types::{DeployEnv, DeploymentRecord};
use tracing::{debug, warn};

/// Default location of the history log.
pub const DEFAULT_HISTORY_FILE: &str = "deployment-history.log";

/// Durable record of deployment and rollback attempts.
pub struct DeploymentHistory {
    path: PathBuf,
}

impl DeploymentHistory {
    /// Open (or lazily create) a history log at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// History log at the default path.
    pub fn default_path() -> Self {
        Self::new(DEFAULT_HISTORY_FILE)
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Never fails the caller; a persistence error
    /// costs an audit line, not the rollback verdict.
    pub fn append(&self, record: &DeploymentRecord) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", record.to_line()));

        match result {
            Ok(()) => debug!(path = %self.path.display(), line = %record.to_line(), "History record appended"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to append history record"),
        }
    }

    /// All parseable records, in file (chronological) order. A missing
    /// file is an empty history.
    pub fn records(&self) -> Vec<DeploymentRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "History file unreadable, treating as empty");
                return Vec::new();
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match DeploymentRecord::parse_line(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, line, "Skipping malformed history line");
                    None
                }
            })
            .collect()
    }

    /// Records for one environment, in chronological order.
    pub fn records_for(&self, environment: DeployEnv) -> Vec<DeploymentRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.environment == environment)
            .collect()
    }

    /// The previous known-good version for an environment.
    ///
    /// Returns the version of the second-to-last record for that
    /// environment: the most recent record is assumed to be the
    /// deployment currently failing, so the one immediately prior is the
    /// rollback target. `None` when fewer than two records exist, in
    /// which case the caller must fail the rollback explicitly rather
    /// than guess.
    pub fn previous_version(&self, environment: DeployEnv) -> Option<String> {
        let records = self.records_for(environment);
        if records.len() < 2 {
            return None;
        }
        records.get(records.len() - 2).map(|r| r.version.clone())
    }
}
