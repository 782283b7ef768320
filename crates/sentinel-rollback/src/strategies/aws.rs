//! Rollback via AWS ECS task-definition revision.
//!
//! One-step-back model: read the service's current task definition,
//! decrement the trailing revision, update the service, and wait for
//! steady state. The strategy does not search history for an arbitrary
//! target; the revision immediately prior is by definition the last
//! thing that ran.
//!
//! The control plane sits behind [`EcsApi`]. The production
//! implementation drives the `aws` CLI with `--output json` and
//! deserializes the responses into typed structs; tests use an
//! in-memory implementation.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use super::RollbackStrategy;
use crate::error::{RollbackError, RollbackResult};

/// Steady-state signal for one ECS service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcsServiceState {
    /// Number of in-flight deployments. Steady state has exactly one.
    pub deployments: usize,
    /// Currently running task count.
    pub running_count: i64,
    /// Desired task count.
    pub desired_count: i64,
}

impl EcsServiceState {
    /// Whether the service has settled on a single, fully-running deployment.
    pub fn is_stable(&self) -> bool {
        self.deployments == 1 && self.running_count == self.desired_count
    }
}

/// Minimal view of the ECS control plane used by the strategy.
#[async_trait]
pub trait EcsApi: Send + Sync {
    /// Task-definition ARN the service is currently running.
    async fn current_task_definition(&self, cluster: &str, service: &str)
        -> RollbackResult<String>;

    /// Point the service at a task definition (`family:revision`).
    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &str,
    ) -> RollbackResult<()>;

    /// One observation of the service's deployment state.
    async fn service_state(&self, cluster: &str, service: &str) -> RollbackResult<EcsServiceState>;
}

/// Parse `family` and trailing `:<revision>` out of a task-definition ARN
/// (e.g. `arn:aws:ecs:us-east-1:123:task-definition/vista-api:7`).
pub fn parse_task_definition(arn: &str) -> RollbackResult<(String, i64)> {
    let (head, revision) = arn
        .rsplit_once(':')
        .ok_or_else(|| RollbackError::BadTaskDefinitionArn(arn.to_string()))?;
    let revision: i64 = revision
        .parse()
        .map_err(|_| RollbackError::BadTaskDefinitionArn(arn.to_string()))?;
    let family = head.rsplit('/').next().unwrap_or(head).to_string();
    if family.is_empty() {
        return Err(RollbackError::BadTaskDefinitionArn(arn.to_string()));
    }
    Ok((family, revision))
}

/// Strategy for ECS-hosted services.
pub struct AwsEcsStrategy {
    api: Arc<dyn EcsApi>,
    cluster: String,
    service: String,
    stability_timeout: Duration,
    poll_interval: Duration,
}

impl AwsEcsStrategy {
    /// Create a strategy over any ECS API implementation.
    pub fn new(
        api: Arc<dyn EcsApi>,
        cluster: String,
        service: String,
        stability_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            cluster,
            service,
            stability_timeout,
            poll_interval,
        }
    }

    /// Create a strategy driving the `aws` CLI.
    pub fn with_cli(
        cluster: String,
        service: String,
        stability_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self::new(
            Arc::new(EcsCliApi),
            cluster,
            service,
            stability_timeout,
            poll_interval,
        )
    }

    async fn wait_for_steady_state(&self) -> RollbackResult<()> {
        let deadline = tokio::time::Instant::now() + self.stability_timeout;
        loop {
            let state = self.api.service_state(&self.cluster, &self.service).await?;
            debug!(
                deployments = state.deployments,
                running = state.running_count,
                desired = state.desired_count,
                "ECS service state"
            );
            if state.is_stable() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RollbackError::StabilizationTimeout(self.stability_timeout));
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl RollbackStrategy for AwsEcsStrategy {
    /// The resolved target version is informational here: ECS rollback is
    /// strictly one revision back from whatever the service runs now.
    #[instrument(skip(self), fields(strategy = "aws", cluster = %self.cluster, service = %self.service))]
    async fn execute(&self, target_version: &str) -> RollbackResult<()> {
        let arn = self
            .api
            .current_task_definition(&self.cluster, &self.service)
            .await?;
        let (family, revision) = parse_task_definition(&arn)?;

        if revision <= 1 {
            return Err(RollbackError::NoPriorRevision(revision));
        }
        let target = format!("{}:{}", family, revision - 1);

        info!(
            current = %arn,
            target = %target,
            target_version,
            "Rolling ECS service back one task-definition revision"
        );

        self.api
            .update_service(&self.cluster, &self.service, &target)
            .await?;

        self.wait_for_steady_state().await
    }

    fn name(&self) -> &str {
        "aws"
    }
}

// ---- aws CLI transport ----

#[derive(Debug, Deserialize)]
struct DescribeServicesResponse {
    #[serde(default)]
    services: Vec<ServiceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDescription {
    task_definition: String,
    #[serde(default)]
    running_count: i64,
    #[serde(default)]
    desired_count: i64,
    #[serde(default)]
    deployments: Vec<serde_json::Value>,
}

/// `EcsApi` over the `aws` CLI with typed JSON responses.
pub struct EcsCliApi;

impl EcsCliApi {
    async fn describe(
        &self,
        cluster: &str,
        service: &str,
    ) -> RollbackResult<ServiceDescription> {
        let output = Command::new("aws")
            .args([
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--services",
                service,
                "--output",
                "json",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RollbackError::DescribeFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(RollbackError::DescribeFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let response: DescribeServicesResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| RollbackError::DescribeFailed(format!("unparseable response: {e}")))?;

        response
            .services
            .into_iter()
            .next()
            .ok_or_else(|| RollbackError::DescribeFailed(format!("service '{service}' not found")))
    }
}

#[async_trait]
impl EcsApi for EcsCliApi {
    async fn current_task_definition(
        &self,
        cluster: &str,
        service: &str,
    ) -> RollbackResult<String> {
        Ok(self.describe(cluster, service).await?.task_definition)
    }

    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &str,
    ) -> RollbackResult<()> {
        let output = Command::new("aws")
            .args([
                "ecs",
                "update-service",
                "--cluster",
                cluster,
                "--service",
                service,
                "--task-definition",
                task_definition,
                "--output",
                "json",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RollbackError::UpdateFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(RollbackError::UpdateFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn service_state(&self, cluster: &str, service: &str) -> RollbackResult<EcsServiceState> {
        let description = self.describe(cluster, service).await?;
        Ok(EcsServiceState {
            deployments: description.deployments.len(),
            running_count: description.running_count,
            desired_count: description.desired_count,
        })
    }
}
