//! Accounting data model.

use std::fmt;

use chrono::{DateTime, Utc};
use ocserv_core::BYTES_PER_GIB;

/// Quota policy of a user.
///
/// Values outside the known set are kept verbatim so the user row still
/// loads; the engine refuses to make a lock decision for them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrafficType {
    /// No quota.
    #[default]
    Free,
    /// Lock when this month's transmitted bytes reach the limit.
    MonthlyTransmit,
    /// Lock when this month's received bytes reach the limit.
    MonthlyReceive,
    /// Lock when lifetime transmitted bytes reach the limit.
    TotallyTransmit,
    /// Lock when lifetime received bytes reach the limit.
    TotallyReceive,
    /// Unknown stored value.
    Unrecognized(String),
}

impl TrafficType {
    pub const MONTHLY_TRANSMIT: &'static str = "MonthlyTransmit";
    pub const MONTHLY_RECEIVE: &'static str = "MonthlyReceive";

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Free" => Self::Free,
            Self::MONTHLY_TRANSMIT => Self::MonthlyTransmit,
            Self::MONTHLY_RECEIVE => Self::MonthlyReceive,
            "TotallyTransmit" => Self::TotallyTransmit,
            "TotallyReceive" => Self::TotallyReceive,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Free => "Free",
            Self::MonthlyTransmit => Self::MONTHLY_TRANSMIT,
            Self::MonthlyReceive => Self::MONTHLY_RECEIVE,
            Self::TotallyTransmit => "TotallyTransmit",
            Self::TotallyReceive => "TotallyReceive",
            Self::Unrecognized(s) => s,
        }
    }

    /// Whether the quota is evaluated against the current calendar month.
    #[inline]
    pub fn is_monthly(&self) -> bool {
        matches!(self, Self::MonthlyTransmit | Self::MonthlyReceive)
    }
}

impl fmt::Display for TrafficType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One VPN account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Store key, referenced by traffic samples.
    pub id: i64,
    /// Unique key into the credential store.
    pub username: String,
    pub group: String,
    /// Lifetime received bytes.
    pub rx_bytes: u64,
    /// Lifetime transmitted bytes.
    pub tx_bytes: u64,
    pub traffic_type: TrafficType,
    /// Quota in GiB. Ignored for [`TrafficType::Free`].
    pub traffic_limit_gib: u64,
    pub expire_at: Option<DateTime<Utc>>,
    pub is_locked: bool,
    /// Set exactly when `is_locked` is true.
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl User {
    /// An unlocked `Free` user with zeroed counters.
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            group: "defaults".to_string(),
            rx_bytes: 0,
            tx_bytes: 0,
            traffic_type: TrafficType::Free,
            traffic_limit_gib: 0,
            expire_at: None,
            is_locked: false,
            deactivated_at: None,
        }
    }

    /// Quota threshold in bytes.
    #[inline]
    pub fn threshold_bytes(&self) -> u64 {
        self.traffic_limit_gib.saturating_mul(BYTES_PER_GIB)
    }

    /// Mark the user locked at `at`.
    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.is_locked = true;
        self.deactivated_at = Some(at);
    }

    /// Zero the counters and clear the lock.
    pub fn reset_monthly(&mut self) {
        self.rx_bytes = 0;
        self.tx_bytes = 0;
        self.is_locked = false;
        self.deactivated_at = None;
    }
}

/// One accounting event, append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficSample {
    pub user_id: i64,
    pub rx: u64,
    pub tx: u64,
    pub created_at: DateTime<Utc>,
}

/// Summed sample bytes over a time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficTotals {
    pub rx: u64,
    pub tx: u64,
}

/// Row update written after one accounting event.
///
/// Counters are added to the stored values rather than overwritten, and the
/// lock only applies to a user that is not already deactivated, so a sweep
/// committing while the event is in flight is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    pub user_id: i64,
    /// Received bytes to add.
    pub rx: u64,
    /// Transmitted bytes to add.
    pub tx: u64,
    /// Lock the user at this instant.
    pub locked_at: Option<DateTime<Utc>>,
}

/// Unix seconds to a timestamp, `0` (or less) for unset.
#[inline]
pub(crate) fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        None
    } else {
        DateTime::from_timestamp(secs, 0)
    }
}

/// Clamp a counter into a signed database column.
#[inline]
pub(crate) fn to_db(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Read a signed database column as a counter; negatives read as zero.
#[inline]
pub(crate) fn from_db(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}
