//! Meter and scheduler in one process.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ocserv_config::{CliOverrides, apply_overrides, init_tracing, load_config, validate_config};
use ocserv_ctl::{CommandCredentials, CommandCredentialsConfig};
use ocserv_store::sql::{SqlStore, SqlStoreConfig};
use tracing::{error, info};

/// CLI arguments for the combined run subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the log meter and the sweep scheduler over one store connection.
///
/// Either side stopping stops the other: the end of the log feed, the
/// server shutdown marker, and SIGINT/SIGTERM all cancel the shared token.
pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);
    info!(version = ocserv_core::VERSION, "ocserv-quota starting");

    let shutdown = ocserv_core::shutdown::shutdown_token();

    let store = Arc::new(SqlStore::connect(SqlStoreConfig::from_config(&config.store)).await?);
    let credentials = Arc::new(CommandCredentials::new(
        CommandCredentialsConfig::from_config(&config.credentials),
    ));
    let scheduler =
        ocserv_cron::build_scheduler(&config.scheduler, store.clone(), credentials.clone())?;

    let meter = async {
        let result = ocserv_meter::run_with_shutdown(
            &config.meter,
            store.clone(),
            credentials.clone(),
            shutdown.clone(),
        )
        .await;
        shutdown.cancel();
        result
    };
    let cron = async {
        let result = scheduler.run(shutdown.clone()).await;
        shutdown.cancel();
        result
    };

    let (meter_result, cron_result) = tokio::join!(meter, cron);
    store.close().await;

    if let Err(e) = &cron_result {
        error!(error = %e, "scheduler stopped with error");
    }
    let stats = meter_result?;
    cron_result?;

    info!(
        lines = stats.lines,
        accounted = stats.accounted,
        rejected = stats.rejected,
        "ocserv-quota stopped"
    );
    Ok(())
}
