//! SQL queries for different databases.
//!
//! `expire_at` and `deactivated_at` are unix seconds with `0` meaning unset.

/// Query to find a user by username (PostgreSQL).
pub const FIND_USER_PG: &str = r#"
SELECT id, username, group_name, rx, tx, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at
FROM ocserv_users
WHERE username = $1
"#;

/// Query to find a user by username (MySQL/SQLite).
pub const FIND_USER_MYSQL: &str = r#"
SELECT id, username, group_name, rx, tx, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at
FROM ocserv_users
WHERE username = ?
"#;

/// Query to append a traffic sample (PostgreSQL).
pub const INSERT_SAMPLE_PG: &str = r#"
INSERT INTO ocserv_user_traffic (user_id, rx, tx, created_at)
VALUES ($1, $2, $3, $4)
"#;

/// Query to append a traffic sample (MySQL/SQLite).
pub const INSERT_SAMPLE_MYSQL: &str = r#"
INSERT INTO ocserv_user_traffic (user_id, rx, tx, created_at)
VALUES (?, ?, ?, ?)
"#;

/// Sum of samples in `[from, to)` (PostgreSQL, `SUM(BIGINT)` is `NUMERIC`).
pub const SUM_TRAFFIC_PG: &str = r#"
SELECT CAST(COALESCE(SUM(rx), 0) AS BIGINT) AS total_rx,
       CAST(COALESCE(SUM(tx), 0) AS BIGINT) AS total_tx
FROM ocserv_user_traffic
WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
"#;

/// Sum of samples in `[from, to)` (MySQL, `SUM` is `DECIMAL`).
pub const SUM_TRAFFIC_MYSQL: &str = r#"
SELECT CAST(COALESCE(SUM(rx), 0) AS SIGNED) AS total_rx,
       CAST(COALESCE(SUM(tx), 0) AS SIGNED) AS total_tx
FROM ocserv_user_traffic
WHERE user_id = ? AND created_at >= ? AND created_at < ?
"#;

/// Sum of samples in `[from, to)` (SQLite).
pub const SUM_TRAFFIC_SQLITE: &str = r#"
SELECT COALESCE(SUM(rx), 0) AS total_rx,
       COALESCE(SUM(tx), 0) AS total_tx
FROM ocserv_user_traffic
WHERE user_id = ? AND created_at >= ? AND created_at < ?
"#;

/// Query to add event bytes to the counters (PostgreSQL).
pub const ADD_COUNTERS_PG: &str = r#"
UPDATE ocserv_users
SET rx = rx + $1, tx = tx + $2
WHERE id = $3
"#;

/// Query to add event bytes to the counters (MySQL/SQLite).
pub const ADD_COUNTERS_MYSQL: &str = r#"
UPDATE ocserv_users
SET rx = rx + ?, tx = tx + ?
WHERE id = ?
"#;

/// Query to lock a user over quota unless already deactivated (PostgreSQL).
pub const LOCK_OVER_QUOTA_PG: &str = r#"
UPDATE ocserv_users
SET is_locked = $1, deactivated_at = $2
WHERE id = $3 AND deactivated_at = 0
"#;

/// Query to lock a user over quota unless already deactivated (MySQL/SQLite).
pub const LOCK_OVER_QUOTA_MYSQL: &str = r#"
UPDATE ocserv_users
SET is_locked = ?, deactivated_at = ?
WHERE id = ? AND deactivated_at = 0
"#;

/// Expiry sweep selection (PostgreSQL).
pub const EXPIRED_CANDIDATES_PG: &str = r#"
SELECT id, username, group_name, rx, tx, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at
FROM ocserv_users
WHERE expire_at > 0 AND deactivated_at = 0 AND expire_at < $1
ORDER BY id
"#;

/// Expiry sweep selection (MySQL/SQLite).
pub const EXPIRED_CANDIDATES_MYSQL: &str = r#"
SELECT id, username, group_name, rx, tx, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at
FROM ocserv_users
WHERE expire_at > 0 AND deactivated_at = 0 AND expire_at < ?
ORDER BY id
"#;

/// Monthly reset selection (PostgreSQL).
pub const MONTHLY_CANDIDATES_PG: &str = r#"
SELECT id, username, group_name, rx, tx, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at
FROM ocserv_users
WHERE expire_at > $1 AND deactivated_at > 0 AND traffic_type IN ($2, $3)
ORDER BY id
"#;

/// Monthly reset selection (MySQL/SQLite).
pub const MONTHLY_CANDIDATES_MYSQL: &str = r#"
SELECT id, username, group_name, rx, tx, traffic_type, traffic_limit, expire_at, is_locked, deactivated_at
FROM ocserv_users
WHERE expire_at > ? AND deactivated_at > 0 AND traffic_type IN (?, ?)
ORDER BY id
"#;

/// Query to lock an expired user (PostgreSQL).
pub const MARK_EXPIRED_PG: &str = r#"
UPDATE ocserv_users
SET is_locked = $1, deactivated_at = $2
WHERE id = $3
"#;

/// Query to lock an expired user (MySQL/SQLite).
pub const MARK_EXPIRED_MYSQL: &str = r#"
UPDATE ocserv_users
SET is_locked = ?, deactivated_at = ?
WHERE id = ?
"#;

/// Query to reset monthly counters (PostgreSQL).
pub const RESET_MONTHLY_PG: &str = r#"
UPDATE ocserv_users
SET rx = 0, tx = 0, is_locked = $1, deactivated_at = 0
WHERE id = $2
"#;

/// Query to reset monthly counters (MySQL/SQLite).
pub const RESET_MONTHLY_MYSQL: &str = r#"
UPDATE ocserv_users
SET rx = 0, tx = 0, is_locked = ?, deactivated_at = 0
WHERE id = ?
"#;
