//! Disconnect event extraction from raw ocserv log lines.

use std::sync::LazyLock;

use ocserv_core::{DISCONNECT_MARKER, SERVER_SHUTDOWN_MARKER};
use regex::Regex;

use crate::error::MeterError;

const DISCONNECT_PATTERN: &str = r"main\[(.*?)\].*rx:\s*(\d+),\s*tx:\s*(\d+)";

static DISCONNECT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(DISCONNECT_PATTERN).ok());

/// Bytes moved during one VPN session, reported when it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectEvent {
    pub username: String,
    pub rx: u64,
    pub tx: u64,
}

/// Classification of one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Disconnect(DisconnectEvent),
    /// Nothing to account.
    NoEvent,
    /// The server shut down; the process must terminate.
    FatalSignal,
}

/// Classify one raw log line.
///
/// Only lines mentioning a user disconnect are parsed; a disconnect line
/// that does not match the expected shape is [`MeterError::Malformed`].
pub fn extract(line: &str) -> Result<Extracted, MeterError> {
    let line = line.trim();

    if line.contains(SERVER_SHUTDOWN_MARKER) {
        return Ok(Extracted::FatalSignal);
    }
    if !line.contains(DISCONNECT_MARKER) {
        return Ok(Extracted::NoEvent);
    }

    let Some(re) = DISCONNECT_RE.as_ref() else {
        return Err(MeterError::Malformed("disconnect pattern unavailable".into()));
    };
    let caps = re
        .captures(line)
        .ok_or_else(|| MeterError::Malformed(line.to_string()))?;

    let username = caps[1].trim();
    if username.is_empty() {
        return Err(MeterError::Malformed(line.to_string()));
    }
    let rx = caps[2]
        .parse::<u64>()
        .map_err(|e| MeterError::Malformed(format!("rx {}: {e}", &caps[2])))?;
    let tx = caps[3]
        .parse::<u64>()
        .map_err(|e| MeterError::Malformed(format!("tx {}: {e}", &caps[3])))?;

    Ok(Extracted::Disconnect(DisconnectEvent {
        username: username.to_string(),
        rx,
        tx,
    }))
}
