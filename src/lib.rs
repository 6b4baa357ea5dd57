//! # ocserv-quota
//!
//! Usage metering and quota enforcement for ocserv VPN gateways.
//!
//! ## Crates
//!
//! - [`ocserv_core`] - Default constants, error labels, shutdown wiring
//! - [`ocserv_config`] - Configuration loading and validation
//! - [`ocserv_store`] - Traffic/user store and its SQL backend
//! - [`ocserv_ctl`] - Credential actions through `ocpasswd`/`occtl`
//! - [`ocserv_meter`] - Log-driven accounting and quota locks
//! - [`ocserv_cron`] - Expiry sweep and monthly reset scheduler

pub mod run;

pub use ocserv_config as config;
pub use ocserv_core as core;
pub use ocserv_cron as cron;
pub use ocserv_ctl as ctl;
pub use ocserv_meter as meter;
pub use ocserv_store as store;

pub use run::RunArgs;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use ocserv_config::{Config, load_config, validate_config};
    pub use ocserv_cron::{BatchExecutor, Job, RunStateFile, Schedule, Scheduler, SweepJobs};
    pub use ocserv_ctl::{CommandCredentials, CredentialStore, RecordingCredentials};
    pub use ocserv_meter::{AccountingEngine, DisconnectEvent, Extracted, MeterError, extract};
    pub use ocserv_store::{MemoryStore, TrafficType, User, UserStore};
}
