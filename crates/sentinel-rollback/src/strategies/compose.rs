//! Rollback via Docker Compose image tag rewrite.
//!
//! The mutation is transactional around the compose file, not around the
//! running containers: the original file content is snapshotted in
//! memory before rewriting, and restored on any exit path that is not
//! full success. If the pull fails, nothing has been restarted and the
//! file is byte-identical to before the attempt.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, instrument};

use super::RollbackStrategy;
use crate::error::{RollbackError, RollbackResult};

/// Process-level compose operations, separated from the file mechanics
/// so the strategy is testable without a Docker daemon.
#[async_trait]
pub trait ComposeRunner: Send + Sync {
    /// Pull the (re-tagged) image for one service.
    async fn pull(&self, compose_file: &Path, service: &str) -> RollbackResult<()>;

    /// Restart the stack with the current compose file.
    async fn up(&self, compose_file: &Path) -> RollbackResult<()>;
}

/// Runner that shells out to `docker compose`.
pub struct DockerComposeRunner;

#[async_trait]
impl ComposeRunner for DockerComposeRunner {
    async fn pull(&self, compose_file: &Path, service: &str) -> RollbackResult<()> {
        let output = Command::new("docker")
            .args(["compose", "-f"])
            .arg(compose_file)
            .args(["pull", service])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RollbackError::PullFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(RollbackError::PullFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn up(&self, compose_file: &Path) -> RollbackResult<()> {
        let output = Command::new("docker")
            .args(["compose", "-f"])
            .arg(compose_file)
            .args(["up", "-d"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RollbackError::RestartFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(RollbackError::RestartFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// Strategy for Compose-hosted stacks.
pub struct ComposeStrategy {
    runner: Arc<dyn ComposeRunner>,
    compose_file: PathBuf,
    service: String,
}

impl ComposeStrategy {
    /// Create a strategy over any compose runner.
    pub fn new(runner: Arc<dyn ComposeRunner>, compose_file: PathBuf, service: String) -> Self {
        Self {
            runner,
            compose_file,
            service,
        }
    }

    /// Create a strategy shelling out to `docker compose`.
    pub fn with_docker(compose_file: PathBuf, service: String) -> Self {
        Self::new(Arc::new(DockerComposeRunner), compose_file, service)
    }

    async fn restore(&self, original: &str) {
        if let Err(e) = tokio::fs::write(&self.compose_file, original).await {
            // The attempt already failed; all we can do is tell the operator.
            error!(
                path = %self.compose_file.display(),
                error = %e,
                "Failed to restore compose file after rollback failure"
            );
        }
    }
}

#[async_trait]
impl RollbackStrategy for ComposeStrategy {
    #[instrument(skip(self), fields(strategy = "docker", service = %self.service))]
    async fn execute(&self, target_version: &str) -> RollbackResult<()> {
        let original = tokio::fs::read_to_string(&self.compose_file).await?;
        let updated = rewrite_image_tag(&original, &self.service, target_version)?;

        info!(
            path = %self.compose_file.display(),
            target_version,
            "Rewriting compose image tag"
        );
        tokio::fs::write(&self.compose_file, &updated).await?;

        if let Err(e) = self.runner.pull(&self.compose_file, &self.service).await {
            // Nothing restarted yet; undo the file mutation.
            self.restore(&original).await;
            return Err(e);
        }

        if let Err(e) = self.runner.up(&self.compose_file).await {
            self.restore(&original).await;
            return Err(e);
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "docker"
    }
}

/// Rewrite the `image:` tag of one service in a compose file to `tag`,
/// leaving every other byte untouched.
pub fn rewrite_image_tag(content: &str, service: &str, tag: &str) -> RollbackResult<String> {
    let service_key = format!("{service}:");
    let mut lines: Vec<String> = Vec::with_capacity(content.lines().count());
    let mut service_indent: Option<usize> = None;
    let mut rewritten = false;

    for line in content.lines() {
        let trimmed = line.trim();
        let indent = line.len() - line.trim_start().len();

        // Leaving the service block: first non-empty line at or above
        // the service's own indent level.
        if let Some(si) = service_indent {
            if !trimmed.is_empty() && indent <= si {
                service_indent = None;
            }
        }

        if service_indent.is_none() && trimmed == service_key {
            service_indent = Some(indent);
        } else if service_indent.is_some() && !rewritten {
            if let Some(value) = trimmed.strip_prefix("image:") {
                let image = retag(value.trim(), tag);
                lines.push(format!("{}image: {}", " ".repeat(indent), image));
                rewritten = true;
                continue;
            }
        }

        lines.push(line.to_string());
    }

    if !rewritten {
        return Err(RollbackError::Configuration(format!(
            "no image entry for service '{service}' in compose file"
        )));
    }

    let mut result = lines.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Replace the tag of an image reference, respecting registries with
/// ports (`localhost:5000/repo` has no tag; its colon belongs to the host).
fn retag(image: &str, tag: &str) -> String {
    let last_slash = image.rfind('/').map_or(0, |i| i);
    match image.rfind(':').filter(|i| *i > last_slash) {
        Some(i) => format!("{}:{}", &image[..i], tag),
        None => format!("{image}:{tag}"),
    }
}
