//! Sentinel CLI - Deployment monitoring and automated rollback
//!
//! This CLI gives operators a terminal interface to:
//! - Run a monitoring session against a deployed Vista endpoint
//! - Trigger a rollback for one deployment environment
//! - Combine the two: monitor, then roll back automatically on escalation

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sentinel_health::{CheckThresholds, MonitorConfig, MonitoringSession, SessionVerdict};
use sentinel_rollback::history::DEFAULT_HISTORY_FILE;
use sentinel_rollback::{
    DeploymentHistory, Notifier, RollbackConfig, RollbackOrchestrator, VerifyConfig,
};
use sentinel_types::DeployEnv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sentinel CLI application
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Sentinel - deployment health monitoring and automated rollback", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run a monitoring session against a deployed endpoint
    Monitor(MonitorArgs),

    /// Roll a deployment environment back to its previous version
    Rollback(RollbackArgs),
}

#[derive(clap::Args)]
struct MonitorArgs {
    /// Deployment environment being monitored (render, aws, docker)
    #[arg(short, long)]
    environment: DeployEnv,

    /// Base URL of the deployed API
    #[arg(short, long, env = "SENTINEL_API_URL")]
    api_url: String,

    /// Session duration in seconds (bounded mode)
    #[arg(short, long, default_value_t = 300)]
    duration: u64,

    /// Monitor until escalation instead of for a fixed duration
    #[arg(long, conflicts_with = "duration")]
    continuous: bool,

    /// Seconds between monitoring rounds
    #[arg(short, long, default_value_t = 30)]
    interval: u64,

    /// Write the JSON session report to this file
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Error-rate check threshold, in percent
    #[arg(long, default_value_t = 5.0)]
    error_threshold: f64,

    /// p95 response-time check threshold, in milliseconds
    #[arg(long, default_value_t = 1000.0)]
    response_threshold: f64,

    /// Consecutive failed rounds before escalating
    #[arg(long, default_value_t = 3)]
    max_consecutive_failures: u32,
}

#[derive(clap::Args)]
struct RollbackArgs {
    /// Deployment environment to roll back (render, aws, docker)
    #[arg(short, long)]
    environment: DeployEnv,

    /// Base URL of the deployed API, probed to verify recovery
    #[arg(short, long, env = "SENTINEL_API_URL")]
    api_url: String,

    /// Explicit target version; defaults to the previous version from history
    #[arg(long)]
    version: Option<String>,

    /// Monitor first and roll back only if the session escalates
    #[arg(long)]
    auto: bool,

    /// Deployment history file
    #[arg(long, env = "DEPLOY_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE)]
    history_file: PathBuf,
}

impl MonitorArgs {
    fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.interval),
            duration: (!self.continuous).then(|| Duration::from_secs(self.duration)),
            thresholds: CheckThresholds {
                error_rate_pct: self.error_threshold,
                response_time_ms: self.response_threshold,
            },
            max_consecutive_failures: self.max_consecutive_failures,
            ..MonitorConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let exit_code = match cli.command {
        Commands::Monitor(args) => monitor(args).await?,
        Commands::Rollback(args) => rollback(args).await?,
    };
    std::process::exit(exit_code);
}

/// Run a monitoring session and map its verdict to an exit code.
async fn monitor(args: MonitorArgs) -> anyhow::Result<i32> {
    info!(
        environment = %args.environment,
        api_url = %args.api_url,
        "Starting monitoring session"
    );

    let session = MonitoringSession::for_endpoint(&args.api_url, args.monitor_config())?;
    let report = session.run().await;

    if let Some(path) = &args.report {
        std::fs::write(path, report.to_json()?)?;
        info!(path = %path.display(), "Session report written");
    }

    println!(
        "{}: {} rounds, {} failed ({}% failure rate)",
        verdict_label(report.verdict),
        report.state.total_checks,
        report.state.failed_checks,
        report.failure_rate_pct,
    );

    Ok(match report.verdict {
        SessionVerdict::Passed => 0,
        SessionVerdict::Failed | SessionVerdict::Escalated => 1,
    })
}

/// Roll back an environment, optionally gated behind a monitoring session.
async fn rollback(args: RollbackArgs) -> anyhow::Result<i32> {
    if args.auto {
        info!(
            environment = %args.environment,
            "Auto mode: monitoring before rollback"
        );
        let session =
            MonitoringSession::for_endpoint(&args.api_url, MonitorConfig::default())?;
        let report = session.run().await;

        match auto_exit(report.verdict) {
            None => warn!("Session escalated, proceeding with rollback"),
            Some(code) => {
                println!("{}: no rollback needed", verdict_label(report.verdict));
                return Ok(code);
            }
        }
    }

    let config = RollbackConfig::from_env();
    let notifier = Notifier::new(config.webhook_url.clone());
    let history = DeploymentHistory::new(&args.history_file);
    let orchestrator = RollbackOrchestrator::new(
        &args.api_url,
        config,
        history,
        notifier,
        VerifyConfig::default(),
    )?;

    let outcome = orchestrator.rollback(args.environment, args.version).await?;
    println!("{}", outcome.message);

    Ok(if outcome.verified { 0 } else { 1 })
}

/// Auto-mode gate: only an escalated session proceeds to rollback.
/// Otherwise the session's own verdict decides the exit code.
fn auto_exit(verdict: SessionVerdict) -> Option<i32> {
    match verdict {
        SessionVerdict::Escalated => None,
        SessionVerdict::Passed => Some(0),
        SessionVerdict::Failed => Some(1),
    }
}

fn verdict_label(verdict: SessionVerdict) -> &'static str {
    match verdict {
        SessionVerdict::Passed => "PASSED",
        SessionVerdict::Failed => "FAILED",
        SessionVerdict::Escalated => "ESCALATED",
    }
}
