//! Configuration types.

use std::collections::HashMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::defaults::*;
use crate::error::ConfigError;

/// Wall-clock format for scheduler trigger times.
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Traffic/user store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database URL (`sqlite:`, `postgres://`, `mysql://`).
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Credential-store backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Backend kind. Only `command` is supported in deployments.
    #[serde(default = "default_credential_backend")]
    pub backend: String,
    /// `ocpasswd` executable used for lock/unlock.
    #[serde(default = "default_ocpasswd")]
    pub ocpasswd: String,
    /// ocserv password file passed to `ocpasswd -c`.
    #[serde(default = "default_passwd_file")]
    pub passwd_file: String,
    /// `occtl` executable used for session disconnects.
    #[serde(default = "default_occtl")]
    pub occtl: String,
    /// Per-command timeout in seconds.
    #[serde(default = "default_action_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: default_credential_backend(),
            ocpasswd: default_ocpasswd(),
            passwd_file: default_passwd_file(),
            occtl: default_occtl(),
            timeout_secs: default_action_timeout_secs(),
        }
    }
}

/// Sweep scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run-state file (two `key=date` lines).
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Local time of the daily expiry sweep (`HH:MM:SS`).
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
    /// Local time of the monthly reset on days 1 and 2 (`HH:MM:SS`).
    #[serde(default = "default_monthly_at")]
    pub monthly_at: String,
    /// Maximum concurrent credential actions per sweep.
    #[serde(default = "default_batch_width")]
    pub batch_width: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            daily_at: default_daily_at(),
            monthly_at: default_monthly_at(),
            batch_width: default_batch_width(),
        }
    }
}

impl SchedulerConfig {
    /// Parsed daily trigger time.
    pub fn daily_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("scheduler.daily_at", &self.daily_at)
    }

    /// Parsed monthly trigger time.
    pub fn monthly_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("scheduler.monthly_at", &self.monthly_at)
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|e| {
        ConfigError::Validation(format!("{field} must be HH:MM:SS, got {value:?}: {e}"))
    })
}

/// Log source settings for the meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// `stdin` or `command`.
    #[serde(default = "default_meter_source")]
    pub source: String,
    /// Follower command when `source = "command"`,
    /// e.g. `["journalctl", "-fu", "ocserv", "-o", "cat"]`.
    #[serde(default)]
    pub command: Vec<String>,
    /// Capacity of the raw line channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            source: default_meter_source(),
            command: Vec::new(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level (trace, debug, info, warn, error).
    #[serde(default)]
    pub level: Option<String>,
    /// Output format (json, pretty, compact). Default: pretty
    #[serde(default)]
    pub format: Option<String>,
    /// Output target (stdout, stderr). Default: stderr
    #[serde(default)]
    pub output: Option<String>,
    /// Per-module log level overrides, e.g. `sqlx = "warn"`.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
