//! In-memory traffic/user store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::model::{CounterUpdate, TrafficSample, TrafficTotals, User};
use crate::traits::UserStore;

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    samples: Vec<TrafficSample>,
}

/// [`UserStore`] held entirely in memory.
///
/// Used for tests and dry runs. Writes can be made to fail on demand to
/// exercise the error paths of the engine and the sweeps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_samples: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a set of users.
    pub fn from_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = User>,
    {
        let store = Self::new();
        for user in users {
            store.insert_user(user);
        }
        store
    }

    /// Insert or replace a user keyed by its id.
    pub fn insert_user(&self, user: User) {
        self.inner.lock().users.insert(user.id, user);
    }

    /// Snapshot of a user by id.
    pub fn user(&self, id: i64) -> Option<User> {
        self.inner.lock().users.get(&id).cloned()
    }

    /// Snapshot of every stored sample in append order.
    pub fn samples(&self) -> Vec<TrafficSample> {
        self.inner.lock().samples.clone()
    }

    /// Make `append_sample` fail.
    pub fn fail_sample_writes(&self, fail: bool) {
        self.fail_samples.store(fail, Ordering::Relaxed);
    }

    /// Make every operation fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    #[inline]
    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn update<F>(&self, user_id: i64, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut User),
    {
        self.check()?;
        if let Some(user) = self.inner.lock().users.get_mut(&user_id) {
            f(user);
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn append_sample(&self, sample: &TrafficSample) -> Result<(), StoreError> {
        self.check()?;
        if self.fail_samples.load(Ordering::Relaxed) {
            return Err(StoreError::backend("sample write rejected"));
        }
        self.inner.lock().samples.push(sample.clone());
        Ok(())
    }

    async fn traffic_totals(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TrafficTotals, StoreError> {
        self.check()?;
        let inner = self.inner.lock();
        let totals = inner
            .samples
            .iter()
            .filter(|s| s.user_id == user_id && s.created_at >= from && s.created_at < to)
            .fold(TrafficTotals::default(), |acc, s| TrafficTotals {
                rx: acc.rx.saturating_add(s.rx),
                tx: acc.tx.saturating_add(s.tx),
            });
        Ok(totals)
    }

    async fn save_counters(&self, update: &CounterUpdate) -> Result<(), StoreError> {
        self.update(update.user_id, |stored| {
            stored.rx_bytes = stored.rx_bytes.saturating_add(update.rx);
            stored.tx_bytes = stored.tx_bytes.saturating_add(update.tx);
            if let Some(at) = update.locked_at
                && stored.deactivated_at.is_none()
            {
                stored.deactivate(at);
            }
        })
    }

    async fn expired_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .users
            .values()
            .filter(|u| u.deactivated_at.is_none() && u.expire_at.is_some_and(|e| e < cutoff))
            .cloned()
            .collect())
    }

    async fn monthly_reset_candidates(
        &self,
        today: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .users
            .values()
            .filter(|u| {
                u.traffic_type.is_monthly()
                    && u.deactivated_at.is_some()
                    && u.expire_at.is_some_and(|e| e > today)
            })
            .cloned()
            .collect())
    }

    async fn mark_expired(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(user_id, |user| user.deactivate(at))
    }

    async fn reset_monthly(&self, user_id: i64) -> Result<(), StoreError> {
        self.update(user_id, User::reset_monthly)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::TrafficType;

    fn user(id: i64, name: &str) -> User {
        User::new(id, name)
    }

    #[tokio::test]
    async fn find_by_username() {
        let store = MemoryStore::from_users([user(1, "alice"), user(2, "bob")]);
        assert_eq!(store.find_user("bob").await.unwrap().unwrap().id, 2);
        assert!(store.find_user("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn totals_respect_window() {
        let store = MemoryStore::from_users([user(1, "alice")]);
        let from = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for (rx, created_at) in [(1, from - Duration::seconds(1)), (2, from), (4, to)] {
            store
                .append_sample(&TrafficSample {
                    user_id: 1,
                    rx,
                    tx: rx * 10,
                    created_at,
                })
                .await
                .unwrap();
        }
        let totals = store.traffic_totals(1, from, to).await.unwrap();
        assert_eq!(totals, TrafficTotals { rx: 2, tx: 20 });
    }

    #[tokio::test]
    async fn failure_injection() {
        let store = MemoryStore::from_users([user(1, "alice")]);
        store.fail_sample_writes(true);
        let sample = TrafficSample {
            user_id: 1,
            rx: 1,
            tx: 1,
            created_at: Utc::now(),
        };
        assert!(store.append_sample(&sample).await.is_err());
        assert!(store.samples().is_empty());

        store.set_unavailable(true);
        assert!(matches!(
            store.find_user("alice").await,
            Err(StoreError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn save_counters_adds_and_keeps_existing_lock() {
        let expired_at = Utc.with_ymd_and_hms(2024, 6, 2, 0, 1, 0).unwrap();
        let mut alice = user(1, "alice");
        alice.rx_bytes = 100;
        alice.tx_bytes = 200;
        alice.deactivate(expired_at);
        let store = MemoryStore::from_users([alice, user(2, "bob")]);

        store
            .save_counters(&CounterUpdate {
                user_id: 1,
                rx: 1,
                tx: 2,
                locked_at: Some(expired_at + Duration::hours(3)),
            })
            .await
            .unwrap();
        let stored = store.user(1).unwrap();
        assert_eq!((stored.rx_bytes, stored.tx_bytes), (101, 202));
        assert_eq!(stored.deactivated_at, Some(expired_at));

        store
            .save_counters(&CounterUpdate {
                user_id: 2,
                rx: 5,
                tx: 5,
                locked_at: Some(expired_at),
            })
            .await
            .unwrap();
        let stored = store.user(2).unwrap();
        assert!(stored.is_locked);
        assert_eq!(stored.deactivated_at, Some(expired_at));
    }

    #[tokio::test]
    async fn candidate_selection() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 1, 0).unwrap();
        let mut expired = user(1, "expired");
        expired.expire_at = Some(now - Duration::days(3));
        let mut locked_monthly = user(2, "monthly");
        locked_monthly.traffic_type = TrafficType::MonthlyReceive;
        locked_monthly.expire_at = Some(now + Duration::days(30));
        locked_monthly.deactivate(now - Duration::days(2));
        let store = MemoryStore::from_users([expired, locked_monthly, user(3, "free")]);

        let ids: Vec<_> = store
            .expired_candidates(now - Duration::days(1))
            .await
            .unwrap()
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![1]);

        let ids: Vec<_> = store
            .monthly_reset_candidates(now)
            .await
            .unwrap()
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![2]);

        store.reset_monthly(2).await.unwrap();
        assert!(!store.user(2).unwrap().is_locked);
    }
}
