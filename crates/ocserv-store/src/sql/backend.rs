//! SQL store backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::{
    CounterUpdate, TrafficSample, TrafficTotals, TrafficType, User, from_db, from_unix, to_db,
};
use crate::traits::UserStore;

use super::config::SqlStoreConfig;
use super::queries;

/// Database type enum for query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// MySQL/MariaDB database.
    MySQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    #[inline]
    fn pick(self, pg: &'static str, other: &'static str) -> &'static str {
        match self {
            Self::PostgreSQL => pg,
            Self::MySQL | Self::SQLite => other,
        }
    }
}

/// SQL-backed [`UserStore`].
pub struct SqlStore {
    pool: AnyPool,
    db_type: DatabaseType,
}

impl SqlStore {
    /// Connect to the database.
    pub async fn connect(config: SqlStoreConfig) -> Result<Self, StoreError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let db_type = DatabaseType::from_url(&config.database_url)
            .ok_or_else(|| StoreError::backend("unsupported database URL scheme"))?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.database_url)
            .await?;

        debug!(?db_type, max_connections = config.max_connections, "store connected");
        Ok(Self { pool, db_type })
    }

    /// Underlying connection pool.
    #[inline]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    #[inline]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Parse a user row from AnyRow.
    fn parse_user_row(row: &AnyRow) -> Result<User, StoreError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::Invalid(format!("id: {e}")))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| StoreError::Invalid(format!("username of user {id}: {e}")))?;

        // SQLite stores booleans as integers, so try both types
        let is_locked = row
            .try_get::<bool, _>("is_locked")
            .or_else(|_| row.try_get::<i64, _>("is_locked").map(|v| v != 0))
            .or_else(|_| row.try_get::<i32, _>("is_locked").map(|v| v != 0))
            .unwrap_or(false);

        let traffic_type = row
            .try_get::<String, _>("traffic_type")
            .map(|s| TrafficType::parse(&s))
            .unwrap_or_default();

        let counter = |column: &str| -> Result<u64, StoreError> {
            row.try_get::<i64, _>(column)
                .map(from_db)
                .map_err(|e| StoreError::Invalid(format!("{column} of user {id}: {e}")))
        };

        Ok(User {
            id,
            username,
            group: row
                .try_get("group_name")
                .unwrap_or_else(|_| "defaults".to_string()),
            rx_bytes: counter("rx")?,
            tx_bytes: counter("tx")?,
            traffic_type,
            traffic_limit_gib: counter("traffic_limit")?,
            expire_at: from_unix(row.try_get("expire_at").unwrap_or(0)),
            is_locked,
            deactivated_at: from_unix(row.try_get("deactivated_at").unwrap_or(0)),
        })
    }

    /// Decode candidate rows, skipping the ones that fail to parse.
    fn parse_user_rows(rows: &[AnyRow]) -> Vec<User> {
        rows.iter()
            .filter_map(|row| match Self::parse_user_row(row) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "skipping malformed user row");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl UserStore for SqlStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = self
            .db_type
            .pick(queries::FIND_USER_PG, queries::FIND_USER_MYSQL);

        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_user_row).transpose()
    }

    async fn append_sample(&self, sample: &TrafficSample) -> Result<(), StoreError> {
        let query = self
            .db_type
            .pick(queries::INSERT_SAMPLE_PG, queries::INSERT_SAMPLE_MYSQL);

        sqlx::query(query)
            .bind(sample.user_id)
            .bind(to_db(sample.rx))
            .bind(to_db(sample.tx))
            .bind(sample.created_at.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn traffic_totals(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TrafficTotals, StoreError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::SUM_TRAFFIC_PG,
            DatabaseType::MySQL => queries::SUM_TRAFFIC_MYSQL,
            DatabaseType::SQLite => queries::SUM_TRAFFIC_SQLITE,
        };

        let row = sqlx::query(query)
            .bind(user_id)
            .bind(from.timestamp())
            .bind(to.timestamp())
            .fetch_one(&self.pool)
            .await?;

        Ok(TrafficTotals {
            rx: from_db(row.try_get("total_rx")?),
            tx: from_db(row.try_get("total_tx")?),
        })
    }

    async fn save_counters(&self, update: &CounterUpdate) -> Result<(), StoreError> {
        // Use transaction so counters and lock land together
        let mut tx = self.pool.begin().await?;

        let query = self
            .db_type
            .pick(queries::ADD_COUNTERS_PG, queries::ADD_COUNTERS_MYSQL);
        sqlx::query(query)
            .bind(to_db(update.rx))
            .bind(to_db(update.tx))
            .bind(update.user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(at) = update.locked_at {
            let query = self
                .db_type
                .pick(queries::LOCK_OVER_QUOTA_PG, queries::LOCK_OVER_QUOTA_MYSQL);
            let result = sqlx::query(query)
                .bind(true)
                .bind(at.timestamp())
                .bind(update.user_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                debug!(user_id = update.user_id, "user already deactivated, lock not applied");
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn expired_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError> {
        let query = self
            .db_type
            .pick(queries::EXPIRED_CANDIDATES_PG, queries::EXPIRED_CANDIDATES_MYSQL);

        let rows = sqlx::query(query)
            .bind(cutoff.timestamp())
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::parse_user_rows(&rows))
    }

    async fn monthly_reset_candidates(
        &self,
        today: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let query = self
            .db_type
            .pick(queries::MONTHLY_CANDIDATES_PG, queries::MONTHLY_CANDIDATES_MYSQL);

        let rows = sqlx::query(query)
            .bind(today.timestamp())
            .bind(TrafficType::MONTHLY_TRANSMIT)
            .bind(TrafficType::MONTHLY_RECEIVE)
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::parse_user_rows(&rows))
    }

    async fn mark_expired(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let query = self
            .db_type
            .pick(queries::MARK_EXPIRED_PG, queries::MARK_EXPIRED_MYSQL);

        sqlx::query(query)
            .bind(true)
            .bind(at.timestamp())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_monthly(&self, user_id: i64) -> Result<(), StoreError> {
        let query = self
            .db_type
            .pick(queries::RESET_MONTHLY_PG, queries::RESET_MONTHLY_MYSQL);

        sqlx::query(query)
            .bind(false)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
