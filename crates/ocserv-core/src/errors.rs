//! Error kind labels for structured logging.
//!
//! Every log record that reports a failure carries one of these in its
//! `kind` field so logs can be filtered by failure class.

/// Traffic/user store failure.
pub const ERROR_STORE: &str = "store";
/// Credential-store command failure (lock, unlock, disconnect).
pub const ERROR_CREDENTIAL: &str = "credential";
/// Unparseable log line or stored value.
pub const ERROR_MALFORMED: &str = "malformed";
/// Event referencing an unknown user.
pub const ERROR_NOT_FOUND: &str = "not_found";
/// Configuration error (e.g. unknown traffic type).
pub const ERROR_CONFIG: &str = "config";
/// Run-state file failure.
pub const ERROR_STATE: &str = "state";
