//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Quota
// ============================================================================

/// Bytes per unit of `traffic_limit` (limits are stored in GiB).
pub const BYTES_PER_GIB: u64 = 1 << 30;

// ============================================================================
// Store Defaults
// ============================================================================

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./db/ocserv.db";
/// Default maximum pooled database connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Default database connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Credential Backend Defaults
// ============================================================================

/// Default credential backend.
pub const DEFAULT_CREDENTIAL_BACKEND: &str = "command";
/// Default `ocpasswd` executable.
pub const DEFAULT_OCPASSWD_BIN: &str = "ocpasswd";
/// Default ocserv password file.
pub const DEFAULT_PASSWD_FILE: &str = "/etc/ocserv/ocpasswd";
/// Default `occtl` executable.
pub const DEFAULT_OCCTL_BIN: &str = "occtl";
/// Default timeout for a single credential command in seconds.
pub const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Scheduler Defaults
// ============================================================================

/// Default run-state file path.
pub const DEFAULT_STATE_FILE: &str = "cron_journal/cron_state.txt";
/// Default local time of the daily expiry sweep.
pub const DEFAULT_DAILY_AT: &str = "00:01:00";
/// Default local time of the monthly reset.
pub const DEFAULT_MONTHLY_AT: &str = "00:01:00";
/// Days of the month on which the monthly reset fires.
///
/// Day 2 is a redundant trigger covering a restart that missed day 1.
pub const MONTHLY_RESET_DAYS: [u32; 2] = [1, 2];
/// Default number of in-flight batch actions.
pub const DEFAULT_BATCH_WIDTH: usize = 10;
/// Grace period after `expire_at` before a user is expired, in days.
pub const EXPIRY_GRACE_DAYS: i64 = 1;

// ============================================================================
// Meter Defaults
// ============================================================================

/// Default log source.
pub const DEFAULT_METER_SOURCE: &str = "stdin";
/// Default capacity of the raw line channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

// ============================================================================
// Log Markers
// ============================================================================

/// Marker ocserv prints when it exits.
pub const SERVER_SHUTDOWN_MARKER: &str = "server shutdown complete";
/// Marker on session-termination lines.
pub const DISCONNECT_MARKER: &str = "user disconnected";
