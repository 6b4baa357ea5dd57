//! Expiry and monthly-reset sweep bodies.
//!
//! Both sweeps are idempotent: a user handled once is no longer selected,
//! so a duplicated catch-up run does nothing.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use ocserv_core::{ERROR_CREDENTIAL, EXPIRY_GRACE_DAYS};
use ocserv_ctl::{CredentialStore, CtlError};
use ocserv_store::{StoreError, User, UserStore};
use tracing::{info, warn};

use crate::batch::{BatchExecutor, BatchReport};
use crate::error::CronError;

/// Scheduled job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Lock users past their expiry date.
    Daily,
    /// Unlock and zero monthly-quota users at the start of a month.
    Monthly,
}

impl Job {
    pub fn name(self) -> &'static str {
        match self {
            Self::Daily => "expiry_sweep",
            Self::Monthly => "monthly_reset",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of one user within a sweep.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("{username}: store update failed: {source}")]
    Store {
        username: String,
        #[source]
        source: StoreError,
    },

    #[error("{username}: credential action failed: {source}")]
    Credential {
        username: String,
        #[source]
        source: CtlError,
    },
}

/// The two sweep jobs over a shared store and credential backend.
pub struct SweepJobs<S, C> {
    store: Arc<S>,
    credentials: Arc<C>,
    executor: BatchExecutor,
}

impl<S, C> SweepJobs<S, C>
where
    S: UserStore + 'static,
    C: CredentialStore + 'static,
{
    pub fn new(store: Arc<S>, credentials: Arc<C>, executor: BatchExecutor) -> Self {
        Self {
            store,
            credentials,
            executor,
        }
    }

    /// Run `job` as of `now`.
    ///
    /// Errors only when the selection fails; per-user failures are counted
    /// in the report.
    pub async fn run(&self, job: Job, now: DateTime<Utc>) -> Result<BatchReport, CronError> {
        let report = match job {
            Job::Daily => self.expiry_sweep(now).await?,
            Job::Monthly => self.monthly_reset(now).await?,
        };
        info!(
            job = %job,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "sweep finished"
        );
        Ok(report)
    }

    /// Lock users whose `expire_at` is more than a day in the past.
    pub async fn expiry_sweep(&self, now: DateTime<Utc>) -> Result<BatchReport, CronError> {
        let cutoff = now - Duration::days(EXPIRY_GRACE_DAYS);
        let users = self.store.expired_candidates(cutoff).await?;
        info!(job = %Job::Daily, candidates = users.len(), "selected expired users");

        let report = self
            .executor
            .run(users, |user| {
                let store = self.store.clone();
                let credentials = self.credentials.clone();
                async move { expire_user(&*store, &*credentials, user, now).await }
            })
            .await;
        Ok(report)
    }

    /// Reset deactivated monthly-quota users that are not yet expired.
    pub async fn monthly_reset(&self, now: DateTime<Utc>) -> Result<BatchReport, CronError> {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let users = self.store.monthly_reset_candidates(today).await?;
        info!(job = %Job::Monthly, candidates = users.len(), "selected monthly users");

        let report = self
            .executor
            .run(users, |user| {
                let store = self.store.clone();
                let credentials = self.credentials.clone();
                async move { reset_user(&*store, &*credentials, user).await }
            })
            .await;
        Ok(report)
    }
}

async fn expire_user<S, C>(
    store: &S,
    credentials: &C,
    user: User,
    now: DateTime<Utc>,
) -> Result<(), ItemError>
where
    S: UserStore + ?Sized,
    C: CredentialStore + ?Sized,
{
    store
        .mark_expired(user.id, now)
        .await
        .map_err(|source| ItemError::Store {
            username: user.username.clone(),
            source,
        })?;

    // An offline user has no session, so a disconnect failure must not
    // prevent the lock.
    let disconnect = credentials.disconnect_session(&user.username).await;
    if let Err(e) = &disconnect {
        warn!(username = %user.username, kind = ERROR_CREDENTIAL, error = %e, "disconnect failed");
    }
    let lock = credentials.lock(&user.username).await;

    match lock.and(disconnect) {
        Ok(_) => {
            info!(username = %user.username, "expired user locked");
            Ok(())
        }
        Err(source) => Err(ItemError::Credential {
            username: user.username,
            source,
        }),
    }
}

async fn reset_user<S, C>(store: &S, credentials: &C, user: User) -> Result<(), ItemError>
where
    S: UserStore + ?Sized,
    C: CredentialStore + ?Sized,
{
    store
        .reset_monthly(user.id)
        .await
        .map_err(|source| ItemError::Store {
            username: user.username.clone(),
            source,
        })?;

    credentials
        .unlock(&user.username)
        .await
        .map_err(|source| ItemError::Credential {
            username: user.username.clone(),
            source,
        })?;

    info!(username = %user.username, "monthly quota reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ocserv_ctl::{Action, RecordingCredentials};
    use ocserv_store::{MemoryStore, TrafficType};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 1, 0).unwrap()
    }

    fn jobs(
        users: Vec<User>,
    ) -> (
        SweepJobs<MemoryStore, RecordingCredentials>,
        Arc<MemoryStore>,
        Arc<RecordingCredentials>,
    ) {
        let store = Arc::new(MemoryStore::from_users(users));
        let creds = Arc::new(RecordingCredentials::new());
        (
            SweepJobs::new(store.clone(), creds.clone(), BatchExecutor::new(4)),
            store,
            creds,
        )
    }

    fn expiring(id: i64, name: &str, days_ago: i64) -> User {
        let mut u = User::new(id, name);
        u.expire_at = Some(now() - Duration::days(days_ago));
        u
    }

    fn locked_monthly(id: i64, name: &str) -> User {
        let mut u = User::new(id, name);
        u.traffic_type = TrafficType::MonthlyTransmit;
        u.rx_bytes = 10;
        u.tx_bytes = 20;
        u.expire_at = Some(now() + Duration::days(60));
        u.deactivate(now() - Duration::days(5));
        u
    }

    #[tokio::test]
    async fn expiry_sweep_respects_grace_day() {
        let (jobs, store, creds) = jobs(vec![expiring(1, "old", 3), expiring(2, "fresh", 0)]);

        let report = jobs.run(Job::Daily, now()).await.unwrap();
        assert_eq!((report.total, report.succeeded), (1, 1));

        let old = store.user(1).unwrap();
        assert!(old.is_locked);
        assert_eq!(old.deactivated_at, Some(now()));
        assert!(!store.user(2).unwrap().is_locked);
        assert_eq!(
            creds.calls(),
            vec![
                (Action::Disconnect, "old".to_string()),
                (Action::Lock, "old".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn disconnect_failure_still_locks() {
        let (jobs, store, creds) = jobs(vec![expiring(1, "offline", 3)]);
        creds.fail_on(Action::Disconnect, "offline");

        let report = jobs.run(Job::Daily, now()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(creds.calls_for(Action::Lock), vec!["offline".to_string()]);
        assert!(store.user(1).unwrap().is_locked);
    }

    #[tokio::test]
    async fn monthly_reset_unlocks_and_zeroes() {
        let (jobs, store, creds) = jobs(vec![locked_monthly(1, "alice")]);

        let report = jobs.run(Job::Monthly, now()).await.unwrap();
        assert_eq!(report.succeeded, 1);
        let alice = store.user(1).unwrap();
        assert!(!alice.is_locked && alice.deactivated_at.is_none());
        assert_eq!((alice.rx_bytes, alice.tx_bytes), (0, 0));
        assert_eq!(creds.calls_for(Action::Unlock), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn monthly_reset_twice_is_harmless() {
        let (jobs, store, creds) = jobs(vec![locked_monthly(1, "alice")]);

        jobs.run(Job::Monthly, now()).await.unwrap();
        let after_first = store.user(1).unwrap();
        let report = jobs.run(Job::Monthly, now()).await.unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(store.user(1).unwrap(), after_first);
        assert_eq!(creds.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_selection_is_an_error() {
        let (jobs, store, _) = jobs(vec![expiring(1, "old", 3)]);
        store.set_unavailable(true);
        assert!(matches!(
            jobs.run(Job::Daily, now()).await,
            Err(CronError::Store(_))
        ));
    }
}
