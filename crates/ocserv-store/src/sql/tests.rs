//! Tests for the SQL store backend.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::sql::{DatabaseType, SqlStore, SqlStoreConfig};
use crate::{CounterUpdate, StoreError, TrafficSample, TrafficType, UserStore};

/// Create test database schema.
async fn create_schema(store: &SqlStore) {
    let users = r#"
        CREATE TABLE IF NOT EXISTS ocserv_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            group_name TEXT NOT NULL DEFAULT 'defaults',
            rx INTEGER NOT NULL DEFAULT 0,
            tx INTEGER NOT NULL DEFAULT 0,
            traffic_type TEXT NOT NULL DEFAULT 'Free',
            traffic_limit INTEGER NOT NULL DEFAULT 0,
            expire_at INTEGER NOT NULL DEFAULT 0,
            is_locked INTEGER NOT NULL DEFAULT 0,
            deactivated_at INTEGER NOT NULL DEFAULT 0
        )
    "#;
    let traffic = r#"
        CREATE TABLE IF NOT EXISTS ocserv_user_traffic (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            rx INTEGER NOT NULL DEFAULT 0,
            tx INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
    "#;

    for ddl in [users, traffic] {
        sqlx::query(ddl)
            .execute(store.pool())
            .await
            .expect("Failed to create table");
    }
}

/// Insert a test user and return its id.
async fn insert_user(
    store: &SqlStore,
    username: &str,
    traffic_type: &str,
    traffic_limit: i64,
    expire_at: i64,
    deactivated_at: i64,
) -> i64 {
    let insert = r#"
        INSERT INTO ocserv_users (username, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at)
        VALUES (?, ?, ?, ?, ?, ?)
    "#;

    sqlx::query(insert)
        .bind(username)
        .bind(traffic_type)
        .bind(traffic_limit)
        .bind(expire_at)
        .bind(deactivated_at > 0)
        .bind(deactivated_at)
        .execute(store.pool())
        .await
        .expect("Failed to insert user");

    store
        .find_user(username)
        .await
        .unwrap()
        .expect("inserted user")
        .id
}

/// Create a test SqlStore with in-memory SQLite.
async fn setup_test_db() -> SqlStore {
    let config = SqlStoreConfig::new("sqlite::memory:")
        .max_connections(1)
        .idle_timeout(None);

    let store = SqlStore::connect(config).await.expect("Failed to connect");
    create_schema(&store).await;
    store
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_database_type_detection() {
    assert_eq!(
        DatabaseType::from_url("postgres://localhost/db"),
        Some(DatabaseType::PostgreSQL)
    );
    assert_eq!(
        DatabaseType::from_url("postgresql://localhost/db"),
        Some(DatabaseType::PostgreSQL)
    );
    assert_eq!(
        DatabaseType::from_url("mysql://localhost/db"),
        Some(DatabaseType::MySQL)
    );
    assert_eq!(
        DatabaseType::from_url("mariadb://localhost/db"),
        Some(DatabaseType::MySQL)
    );
    assert_eq!(
        DatabaseType::from_url("sqlite::memory:"),
        Some(DatabaseType::SQLite)
    );
    assert_eq!(DatabaseType::from_url("invalid://localhost"), None);
}

#[tokio::test]
async fn test_connect_rejects_unknown_scheme() {
    let result = SqlStore::connect(SqlStoreConfig::new("redis://localhost")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_find_user() {
    let store = setup_test_db().await;
    insert_user(&store, "alice", "MonthlyTransmit", 10, 0, 0).await;

    let user = store.find_user("alice").await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.group, "defaults");
    assert_eq!(user.traffic_type, TrafficType::MonthlyTransmit);
    assert_eq!(user.traffic_limit_gib, 10);
    assert!(!user.is_locked);
    assert!(user.expire_at.is_none());
    assert!(user.deactivated_at.is_none());

    assert!(store.find_user("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_traffic_type_loads() {
    let store = setup_test_db().await;
    insert_user(&store, "alice", "Weekly", 1, 0, 0).await;

    let user = store.find_user("alice").await.unwrap().unwrap();
    assert_eq!(user.traffic_type, TrafficType::Unrecognized("Weekly".into()));
}

#[tokio::test]
async fn test_traffic_totals_range_is_half_open() {
    let store = setup_test_db().await;
    let id = insert_user(&store, "alice", "MonthlyReceive", 1, 0, 0).await;
    let from = at(2024, 3, 1);
    let to = at(2024, 4, 1);

    for (rx, tx, created_at) in [
        (100, 10, from - Duration::seconds(1)),
        (200, 20, from),
        (300, 30, to - Duration::seconds(1)),
        (400, 40, to),
    ] {
        store
            .append_sample(&TrafficSample {
                user_id: id,
                rx,
                tx,
                created_at,
            })
            .await
            .unwrap();
    }

    let totals = store.traffic_totals(id, from, to).await.unwrap();
    assert_eq!((totals.rx, totals.tx), (500, 50));
}

#[tokio::test]
async fn test_traffic_totals_empty_is_zero() {
    let store = setup_test_db().await;
    let id = insert_user(&store, "alice", "Free", 0, 0, 0).await;

    let totals = store
        .traffic_totals(id, at(2024, 1, 1), at(2024, 2, 1))
        .await
        .unwrap();
    assert_eq!((totals.rx, totals.tx), (0, 0));
}

#[tokio::test]
async fn test_save_counters() {
    let store = setup_test_db().await;
    let id = insert_user(&store, "alice", "TotallyTransmit", 1, 0, 0).await;

    for (rx, tx) in [(1_000, 2_000), (500, 500)] {
        store
            .save_counters(&CounterUpdate {
                user_id: id,
                rx,
                tx,
                locked_at: None,
            })
            .await
            .unwrap();
    }
    let user = store.find_user("alice").await.unwrap().unwrap();
    assert_eq!((user.rx_bytes, user.tx_bytes), (1_500, 2_500));
    assert!(!user.is_locked);

    store
        .save_counters(&CounterUpdate {
            user_id: id,
            rx: 0,
            tx: 1,
            locked_at: Some(at(2024, 5, 5)),
        })
        .await
        .unwrap();
    let user = store.find_user("alice").await.unwrap().unwrap();
    assert_eq!(user.tx_bytes, 2_501);
    assert!(user.is_locked);
    assert_eq!(user.deactivated_at, Some(at(2024, 5, 5)));
}

#[tokio::test]
async fn test_save_counters_keeps_sweep_lock() {
    let store = setup_test_db().await;
    let id = insert_user(&store, "alice", "TotallyTransmit", 1, 0, 0).await;

    store.mark_expired(id, at(2024, 6, 2)).await.unwrap();
    store
        .save_counters(&CounterUpdate {
            user_id: id,
            rx: 10,
            tx: 20,
            locked_at: Some(at(2024, 6, 3)),
        })
        .await
        .unwrap();

    let user = store.find_user("alice").await.unwrap().unwrap();
    assert!(user.is_locked);
    assert_eq!(user.deactivated_at, Some(at(2024, 6, 2)));
    assert_eq!((user.rx_bytes, user.tx_bytes), (10, 20));
}

#[tokio::test]
async fn test_undecodable_counter_is_invalid() {
    let store = setup_test_db().await;
    let id = insert_user(&store, "alice", "Free", 0, at(2024, 6, 1).timestamp(), 0).await;

    sqlx::query("UPDATE ocserv_users SET rx = 'lots' WHERE id = ?")
        .bind(id)
        .execute(store.pool())
        .await
        .unwrap();

    let err = store.find_user("alice").await.unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
    assert!(store.expired_candidates(at(2024, 6, 10)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_candidates() {
    let store = setup_test_db().await;
    let cutoff = at(2024, 6, 10);
    let expired = insert_user(&store, "expired", "Free", 0, at(2024, 6, 1).timestamp(), 0).await;
    insert_user(&store, "never", "Free", 0, 0, 0).await;
    insert_user(&store, "future", "Free", 0, at(2024, 7, 1).timestamp(), 0).await;
    insert_user(
        &store,
        "already",
        "Free",
        0,
        at(2024, 6, 1).timestamp(),
        at(2024, 6, 2).timestamp(),
    )
    .await;

    let users = store.expired_candidates(cutoff).await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![expired]);
}

#[tokio::test]
async fn test_monthly_reset_candidates() {
    let store = setup_test_db().await;
    let today = at(2024, 6, 1);
    let later = at(2024, 9, 1).timestamp();
    let locked_at = at(2024, 5, 20).timestamp();

    let tx = insert_user(&store, "tx", "MonthlyTransmit", 1, later, locked_at).await;
    let rx = insert_user(&store, "rx", "MonthlyReceive", 1, later, locked_at).await;
    insert_user(&store, "total", "TotallyReceive", 1, later, locked_at).await;
    insert_user(&store, "active", "MonthlyReceive", 1, later, 0).await;
    insert_user(&store, "lapsed", "MonthlyReceive", 1, at(2024, 5, 31).timestamp(), locked_at)
        .await;
    insert_user(&store, "no_expiry", "MonthlyTransmit", 1, 0, locked_at).await;

    let users = store.monthly_reset_candidates(today).await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![tx, rx]);
}

#[tokio::test]
async fn test_mark_expired_then_reset_monthly() {
    let store = setup_test_db().await;
    let id = insert_user(&store, "alice", "MonthlyTransmit", 1, 0, 0).await;

    store.mark_expired(id, at(2024, 6, 2)).await.unwrap();
    let user = store.find_user("alice").await.unwrap().unwrap();
    assert!(user.is_locked);
    assert_eq!(user.deactivated_at, Some(at(2024, 6, 2)));

    store
        .save_counters(&CounterUpdate {
            user_id: id,
            rx: 10,
            tx: 20,
            locked_at: None,
        })
        .await
        .unwrap();

    store.reset_monthly(id).await.unwrap();
    let user = store.find_user("alice").await.unwrap().unwrap();
    assert!(!user.is_locked);
    assert!(user.deactivated_at.is_none());
    assert_eq!((user.rx_bytes, user.tx_bytes), (0, 0));
}
