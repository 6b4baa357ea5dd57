//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override store database URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// Override run-state file path
    #[arg(long)]
    pub state_file: Option<String>,
    /// Override maximum concurrent credential actions per sweep
    #[arg(long)]
    pub batch_width: Option<usize>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.database_url {
        config.store.database_url = v.clone();
    }
    if let Some(v) = &overrides.state_file {
        config.scheduler.state_file = v.clone();
    }
    if let Some(v) = overrides.batch_width {
        config.scheduler.batch_width = v;
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
