//! Store error types.

/// Traffic/user store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend error (database, connection pool, etc.).
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored row could not be decoded.
    #[error("invalid record: {0}")]
    Invalid(String),

    /// The store refused the operation (used by test doubles).
    #[error("store unavailable")]
    Unavailable,
}

impl StoreError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::backend(err)
    }
}
