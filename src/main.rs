//! Unified ocserv-quota CLI.
//!
//! - `ocserv-quota meter` - Account traffic from ocserv logs
//! - `ocserv-quota cron` - Run the expiry sweep and monthly reset
//! - `ocserv-quota run` - Both in one process

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// Blocking stdin reads cannot be interrupted; bound the wait at exit.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// ocserv-quota unified CLI.
#[derive(Parser)]
#[command(
    name = "ocserv-quota",
    version,
    about = "Usage metering and quota enforcement for ocserv",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account traffic from ocserv logs and lock users over quota.
    #[command(name = "meter")]
    Meter(ocserv_meter::MeterArgs),

    /// Run the daily expiry sweep and the monthly reset.
    #[command(name = "cron")]
    Cron(ocserv_cron::CronArgs),

    /// Run the meter and the scheduler together.
    #[command(name = "run")]
    Run(ocserv_quota::RunArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Meter(args) => ocserv_meter::cli::run(args).await,
            Commands::Cron(args) => ocserv_cron::cli::run(args).await,
            Commands::Run(args) => ocserv_quota::run::run(args).await,
        }
    });
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
