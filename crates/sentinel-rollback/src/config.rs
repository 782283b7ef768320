//! Environment-sourced configuration for the rollback strategies.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Settings consumed by the rollback strategies and notifier.
///
/// Each strategy requires only its own fields; the factory fails with a
/// configuration error naming the missing variable when the selected
/// environment's settings are absent.
#[derive(Debug, Clone)]
pub struct RollbackConfig {
    /// Render deploy-trigger webhook URL (`RENDER_ROLLBACK_URL`).
    pub render_trigger_url: Option<String>,

    /// Settle period after triggering the Render webhook. Render's
    /// webhook model gives no confirmation, so the strategy just waits
    /// before handing verification to the orchestrator.
    pub render_settle: Duration,

    /// ECS cluster name or ARN (`ECS_CLUSTER`).
    pub ecs_cluster: Option<String>,

    /// ECS service name (`ECS_SERVICE`).
    pub ecs_service: Option<String>,

    /// Bound on the wait for ECS steady state.
    pub ecs_stability_timeout: Duration,

    /// Poll interval while waiting for ECS steady state.
    pub ecs_poll_interval: Duration,

    /// Compose file path (`COMPOSE_FILE`).
    pub compose_file: Option<PathBuf>,

    /// Service whose image tag is rewritten (`COMPOSE_SERVICE`).
    pub compose_service: String,

    /// Notification webhook URL (`SLACK_WEBHOOK_URL`). Absent means
    /// notifications are a no-op.
    pub webhook_url: Option<String>,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            render_trigger_url: None,
            render_settle: Duration::from_secs(30),
            ecs_cluster: None,
            ecs_service: None,
            ecs_stability_timeout: Duration::from_secs(600),
            ecs_poll_interval: Duration::from_secs(15),
            compose_file: None,
            compose_service: "api".to_string(),
            webhook_url: None,
        }
    }
}

impl RollbackConfig {
    /// Load strategy settings from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            render_trigger_url: env_var("RENDER_ROLLBACK_URL"),
            ecs_cluster: env_var("ECS_CLUSTER"),
            ecs_service: env_var("ECS_SERVICE"),
            compose_file: env_var("COMPOSE_FILE").map(PathBuf::from),
            compose_service: env_var("COMPOSE_SERVICE").unwrap_or(defaults.compose_service),
            webhook_url: env_var("SLACK_WEBHOOK_URL"),
            ..defaults
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
