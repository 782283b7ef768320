//! Rollback strategy implementations.
//!
//! A strategy performs the redeploy mechanics only; verifying that the
//! service actually recovered is the orchestrator's job.

pub mod aws;
pub mod compose;
pub mod render;

pub use aws::{AwsEcsStrategy, EcsApi, EcsCliApi, EcsServiceState};
pub use compose::{ComposeRunner, ComposeStrategy, DockerComposeRunner};
pub use render::RenderStrategy;

use async_trait::async_trait;
use sentinel_types::DeployEnv;

use crate::config::RollbackConfig;
use crate::error::{RollbackError, RollbackResult};

/// Environment-specific redeploy mechanics.
#[async_trait]
pub trait RollbackStrategy: Send + Sync {
    /// Redeploy the target version. Returns once the platform has
    /// accepted the change (and, where the platform supports it,
    /// reached steady state) — without confirming user-visible recovery.
    async fn execute(&self, target_version: &str) -> RollbackResult<()>;

    /// Strategy name for logging.
    fn name(&self) -> &str;
}

/// Build the strategy for an environment from configuration.
///
/// Dispatch over [`DeployEnv`] is exhaustive: an environment without a
/// strategy cannot compile, it cannot fall through at runtime. Missing
/// settings for the selected environment fail here with a configuration
/// error naming the variable.
pub fn for_env(
    environment: DeployEnv,
    config: &RollbackConfig,
) -> RollbackResult<Box<dyn RollbackStrategy>> {
    match environment {
        DeployEnv::Render => {
            let trigger_url = config
                .render_trigger_url
                .clone()
                .ok_or_else(|| RollbackError::Configuration("RENDER_ROLLBACK_URL".into()))?;
            Ok(Box::new(RenderStrategy::new(
                trigger_url,
                config.render_settle,
            )?))
        }
        DeployEnv::Aws => {
            let cluster = config
                .ecs_cluster
                .clone()
                .ok_or_else(|| RollbackError::Configuration("ECS_CLUSTER".into()))?;
            let service = config
                .ecs_service
                .clone()
                .ok_or_else(|| RollbackError::Configuration("ECS_SERVICE".into()))?;
            Ok(Box::new(AwsEcsStrategy::with_cli(
                cluster,
                service,
                config.ecs_stability_timeout,
                config.ecs_poll_interval,
            )))
        }
        DeployEnv::Docker => {
            let compose_file = config
                .compose_file
                .clone()
                .ok_or_else(|| RollbackError::Configuration("COMPOSE_FILE".into()))?;
            Ok(Box::new(ComposeStrategy::with_docker(
                compose_file,
                config.compose_service.clone(),
            )))
        }
    }
}
