//! CLI entry point for the meter subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ocserv_config::{
    CliOverrides, MeterConfig, apply_overrides, init_tracing, load_config, validate_config,
};
use ocserv_ctl::{CommandCredentials, CommandCredentialsConfig, CredentialStore};
use ocserv_store::UserStore;
use ocserv_store::sql::{SqlStore, SqlStoreConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::consumer::{MeterStats, consume};
use crate::engine::AccountingEngine;
use crate::error::MeterError;
use crate::source::{LogSource, spawn_source};

/// CLI arguments for the meter subcommand.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ocserv-meter",
    version,
    about = "Account ocserv session traffic from logs and lock users over quota"
)]
pub struct MeterArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the meter with the given CLI arguments.
pub async fn run(args: MeterArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);
    info!(version = ocserv_core::VERSION, "ocserv meter starting");

    let shutdown = ocserv_core::shutdown::shutdown_token();

    let store = Arc::new(SqlStore::connect(SqlStoreConfig::from_config(&config.store)).await?);
    let credentials = CommandCredentials::new(CommandCredentialsConfig::from_config(
        &config.credentials,
    ));

    let result = run_with_shutdown(&config.meter, store.clone(), credentials, shutdown).await;
    store.close().await;

    let stats = result?;
    info!(
        lines = stats.lines,
        accounted = stats.accounted,
        rejected = stats.rejected,
        "ocserv meter stopped"
    );
    Ok(())
}

/// Run the log pipeline until the source ends or `shutdown` fires.
pub async fn run_with_shutdown<S, C>(
    config: &MeterConfig,
    store: S,
    credentials: C,
    shutdown: CancellationToken,
) -> Result<MeterStats, MeterError>
where
    S: UserStore,
    C: CredentialStore,
{
    let source = LogSource::from_config(config)?;

    // The source task gets a child token so it also stops when the consumer
    // returns for its own reasons.
    let source_shutdown = shutdown.child_token();
    let (lines, source_handle) =
        spawn_source(source, config.channel_capacity, source_shutdown.clone());

    let engine = AccountingEngine::new(store, credentials);
    let result = consume(&engine, lines, shutdown).await;

    source_shutdown.cancel();
    match source_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "log source failed"),
        Err(e) => warn!(error = %e, "log source task panicked"),
    }

    result
}
