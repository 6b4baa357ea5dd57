//! Per-event accounting and quota policy.

use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};
use ocserv_core::{ERROR_CONFIG, ERROR_CREDENTIAL, ERROR_STORE};
use ocserv_ctl::CredentialStore;
use ocserv_store::{CounterUpdate, TrafficSample, TrafficTotals, TrafficType, User, UserStore};
use tracing::{debug, error, info, warn};

use crate::error::MeterError;
use crate::extract::DisconnectEvent;

/// Outcome of accounting one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accounted {
    pub user_id: i64,
    pub username: String,
    /// Lifetime counters after the event.
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Lock state after the event.
    pub is_locked: bool,
    /// This event flipped the user from unlocked to locked.
    pub locked_now: bool,
}

/// `[first day of month, first day of next month)` in UTC.
pub fn month_window(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = now.date_naive().with_day(1)?;
    let end = start.checked_add_months(Months::new(1))?;
    Some((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// Whether the user's quota is reached.
///
/// `None` means no decision can be made: the traffic type is unknown, or a
/// monthly type came without its aggregate.
fn quota_reached(user: &User, monthly: Option<TrafficTotals>) -> Option<bool> {
    let threshold = user.threshold_bytes();
    match &user.traffic_type {
        TrafficType::Free => Some(false),
        TrafficType::TotallyTransmit => Some(user.tx_bytes >= threshold),
        TrafficType::TotallyReceive => Some(user.rx_bytes >= threshold),
        TrafficType::MonthlyTransmit => monthly.map(|m| m.tx >= threshold),
        TrafficType::MonthlyReceive => monthly.map(|m| m.rx >= threshold),
        TrafficType::Unrecognized(_) => None,
    }
}

/// Applies disconnect events to the store and enforces quotas.
///
/// Every event re-reads the user, and the row save only adds the event
/// bytes and applies a lock to a still-active user, so sweeps committing
/// while an event is in flight are never overwritten.
pub struct AccountingEngine<S, C> {
    store: S,
    credentials: C,
}

impl<S, C> AccountingEngine<S, C>
where
    S: UserStore,
    C: CredentialStore,
{
    pub fn new(store: S, credentials: C) -> Self {
        Self { store, credentials }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Account one event at the current time.
    pub async fn on_event(&self, event: &DisconnectEvent) -> Result<Accounted, MeterError> {
        self.on_event_at(event, Utc::now()).await
    }

    /// Account one event as if observed at `now`.
    ///
    /// Steps run in order: sample write, counter update, lock action, row
    /// save. A failed sample write stops before the counters change. A
    /// failed lock action is logged; the locked state is still saved.
    ///
    /// The returned counters and lock state are those seen by this event.
    pub async fn on_event_at(
        &self,
        event: &DisconnectEvent,
        now: DateTime<Utc>,
    ) -> Result<Accounted, MeterError> {
        let mut user = self
            .store
            .find_user(&event.username)
            .await?
            .ok_or_else(|| MeterError::UnknownUser(event.username.clone()))?;

        self.store
            .append_sample(&TrafficSample {
                user_id: user.id,
                rx: event.rx,
                tx: event.tx,
                created_at: now,
            })
            .await?;

        user.rx_bytes = user.rx_bytes.saturating_add(event.rx);
        user.tx_bytes = user.tx_bytes.saturating_add(event.tx);

        let monthly = if user.traffic_type.is_monthly() {
            self.monthly_totals(&user, now).await
        } else {
            None
        };

        let mut locked_now = false;
        match quota_reached(&user, monthly) {
            Some(true) if !user.is_locked => {
                user.deactivate(now);
                locked_now = true;
                match self.credentials.lock(&user.username).await {
                    Ok(_) => info!(username = %user.username, "quota reached, user locked"),
                    Err(e) => warn!(
                        username = %user.username,
                        kind = ERROR_CREDENTIAL,
                        error = %e,
                        "quota reached, but credential lock failed"
                    ),
                }
            }
            Some(_) => {}
            None => {
                if let TrafficType::Unrecognized(value) = &user.traffic_type {
                    error!(
                        username = %user.username,
                        traffic_type = %value,
                        kind = ERROR_CONFIG,
                        "unknown traffic type, lock decision skipped"
                    );
                }
            }
        }

        self.store
            .save_counters(&CounterUpdate {
                user_id: user.id,
                rx: event.rx,
                tx: event.tx,
                locked_at: locked_now.then_some(now),
            })
            .await?;

        debug!(
            username = %user.username,
            rx = event.rx,
            tx = event.tx,
            total_rx = user.rx_bytes,
            total_tx = user.tx_bytes,
            "event accounted"
        );

        Ok(Accounted {
            user_id: user.id,
            username: user.username,
            rx_bytes: user.rx_bytes,
            tx_bytes: user.tx_bytes,
            is_locked: user.is_locked,
            locked_now,
        })
    }

    /// Current-month sample totals, `None` (logged) if unavailable.
    async fn monthly_totals(&self, user: &User, now: DateTime<Utc>) -> Option<TrafficTotals> {
        let (from, to) = month_window(now)?;
        match self.store.traffic_totals(user.id, from, to).await {
            Ok(totals) => Some(totals),
            Err(e) => {
                warn!(
                    username = %user.username,
                    kind = ERROR_STORE,
                    error = %e,
                    "monthly totals unavailable, lock decision skipped"
                );
                None
            }
        }
    }
}
