//! Configuration validation logic.

use crate::Config;
use crate::error::ConfigError;

const SOURCES: [&str; 2] = ["stdin", "command"];
const BACKENDS: [&str; 1] = ["command"];

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.store.database_url.trim().is_empty() {
        return Err(ConfigError::Validation("store.database_url is empty".into()));
    }
    if config.store.max_connections == 0 {
        return Err(ConfigError::Validation(
            "store.max_connections must be > 0".into(),
        ));
    }
    if !BACKENDS.contains(&config.credentials.backend.as_str()) {
        return Err(ConfigError::Validation(format!(
            "credentials.backend must be one of: {BACKENDS:?}"
        )));
    }
    if config.credentials.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "credentials.timeout_secs must be > 0".into(),
        ));
    }
    if config.credentials.passwd_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "credentials.passwd_file is empty".into(),
        ));
    }
    if config.scheduler.state_file.trim().is_empty() {
        return Err(ConfigError::Validation("scheduler.state_file is empty".into()));
    }
    if config.scheduler.batch_width == 0 {
        return Err(ConfigError::Validation(
            "scheduler.batch_width must be > 0".into(),
        ));
    }
    config.scheduler.daily_time()?;
    config.scheduler.monthly_time()?;
    if !SOURCES.contains(&config.meter.source.as_str()) {
        return Err(ConfigError::Validation(format!(
            "meter.source must be one of: {SOURCES:?}"
        )));
    }
    if config.meter.source == "command" && config.meter.command.is_empty() {
        return Err(ConfigError::Validation(
            "meter.command is required when meter.source = \"command\"".into(),
        ));
    }
    if config.meter.channel_capacity == 0 {
        return Err(ConfigError::Validation(
            "meter.channel_capacity must be > 0".into(),
        ));
    }
    Ok(())
}
