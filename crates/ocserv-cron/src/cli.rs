//! CLI entry point for the cron subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ocserv_config::{
    CliOverrides, SchedulerConfig, apply_overrides, init_tracing, load_config, validate_config,
};
use ocserv_ctl::{CommandCredentials, CommandCredentialsConfig, CredentialStore};
use ocserv_store::UserStore;
use ocserv_store::sql::{SqlStore, SqlStoreConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::batch::BatchExecutor;
use crate::jobs::SweepJobs;
use crate::scheduler::{Schedule, Scheduler};
use crate::state::RunStateFile;

/// CLI arguments for the cron subcommand.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ocserv-cron",
    version,
    about = "Run the daily expiry sweep and the monthly quota reset"
)]
pub struct CronArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Run missed jobs once and exit
    #[arg(long)]
    pub catch_up_only: bool,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Build a scheduler from the `[scheduler]` config section.
pub fn build_scheduler<S, C>(
    config: &SchedulerConfig,
    store: Arc<S>,
    credentials: Arc<C>,
) -> Result<Scheduler<S, C>, Box<dyn std::error::Error>>
where
    S: UserStore + 'static,
    C: CredentialStore + 'static,
{
    let schedule = Schedule::from_config(config)?;
    let jobs = SweepJobs::new(store, credentials, BatchExecutor::new(config.batch_width));
    Ok(Scheduler::new(
        jobs,
        RunStateFile::new(&config.state_file),
        schedule,
    ))
}

/// Run the scheduler with the given CLI arguments.
pub async fn run(args: CronArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);
    info!(
        version = ocserv_core::VERSION,
        state_file = %config.scheduler.state_file,
        "ocserv cron starting"
    );

    let store = Arc::new(SqlStore::connect(SqlStoreConfig::from_config(&config.store)).await?);
    let credentials = Arc::new(CommandCredentials::new(
        CommandCredentialsConfig::from_config(&config.credentials),
    ));
    let scheduler = build_scheduler(&config.scheduler, store.clone(), credentials)?;

    let result = if args.catch_up_only {
        catch_up_once(&scheduler).await
    } else {
        let shutdown = ocserv_core::shutdown::shutdown_token();
        run_with_shutdown(&scheduler, shutdown).await
    };
    store.close().await;
    result
}

/// Single catch-up check; fails if a due job could not run.
pub async fn catch_up_once<S, C>(
    scheduler: &Scheduler<S, C>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: UserStore + 'static,
    C: CredentialStore + 'static,
{
    let report = scheduler.catch_up().await?;
    info!(runs = report.runs(), "catch-up finished");
    if !report.failed.is_empty() {
        let names: Vec<_> = report.failed.iter().map(|j| j.name()).collect();
        return Err(format!("catch-up failed for: {}", names.join(", ")).into());
    }
    Ok(())
}

/// Run the scheduler until `shutdown`.
pub async fn run_with_shutdown<S, C>(
    scheduler: &Scheduler<S, C>,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: UserStore + 'static,
    C: CredentialStore + 'static,
{
    scheduler.run(shutdown).await?;
    info!("ocserv cron stopped");
    Ok(())
}
