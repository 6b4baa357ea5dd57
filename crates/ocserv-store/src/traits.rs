//! Data-access trait for the traffic/user store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{CounterUpdate, TrafficSample, TrafficTotals, User};

/// Data-access layer shared by the accounting engine and the sweeps.
///
/// Implementations must be thread-safe (`Send + Sync`); the log consumer,
/// the scheduler and the batch workers call into the same store
/// concurrently. Mutations are field-level updates keyed by user id so one
/// path never clobbers columns owned by another.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by username. `Ok(None)` if absent.
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Append one traffic sample.
    async fn append_sample(&self, sample: &TrafficSample) -> Result<(), StoreError>;

    /// Sum sample bytes for a user with `from <= created_at < to`.
    async fn traffic_totals(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TrafficTotals, StoreError>;

    /// Add event bytes to `rx`/`tx` and apply a quota lock if requested.
    ///
    /// The lock sets `is_locked` and `deactivated_at` only when
    /// `deactivated_at` is still unset.
    async fn save_counters(&self, update: &CounterUpdate) -> Result<(), StoreError>;

    /// Users with `expire_at` set and before `cutoff` that are not deactivated.
    async fn expired_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError>;

    /// Deactivated monthly-quota users whose `expire_at` is after `today`.
    async fn monthly_reset_candidates(
        &self,
        today: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError>;

    /// Lock a user and stamp `deactivated_at`.
    async fn mark_expired(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Zero counters and clear lock state.
    async fn reset_monthly(&self, user_id: i64) -> Result<(), StoreError>;
}

macro_rules! forward_user_store {
    ($wrapper:ident) => {
        #[async_trait]
        impl<S: UserStore + ?Sized> UserStore for $wrapper<S> {
            #[inline]
            async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
                (**self).find_user(username).await
            }

            #[inline]
            async fn append_sample(&self, sample: &TrafficSample) -> Result<(), StoreError> {
                (**self).append_sample(sample).await
            }

            #[inline]
            async fn traffic_totals(
                &self,
                user_id: i64,
                from: DateTime<Utc>,
                to: DateTime<Utc>,
            ) -> Result<TrafficTotals, StoreError> {
                (**self).traffic_totals(user_id, from, to).await
            }

            #[inline]
            async fn save_counters(&self, update: &CounterUpdate) -> Result<(), StoreError> {
                (**self).save_counters(update).await
            }

            #[inline]
            async fn expired_candidates(
                &self,
                cutoff: DateTime<Utc>,
            ) -> Result<Vec<User>, StoreError> {
                (**self).expired_candidates(cutoff).await
            }

            #[inline]
            async fn monthly_reset_candidates(
                &self,
                today: DateTime<Utc>,
            ) -> Result<Vec<User>, StoreError> {
                (**self).monthly_reset_candidates(today).await
            }

            #[inline]
            async fn mark_expired(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
                (**self).mark_expired(user_id, at).await
            }

            #[inline]
            async fn reset_monthly(&self, user_id: i64) -> Result<(), StoreError> {
                (**self).reset_monthly(user_id).await
            }
        }
    };
}

// Blanket implementations so `Arc<S>` / `Box<S>` can be handed to
// components expecting `impl UserStore`.
forward_user_store!(Arc);
forward_user_store!(Box);
