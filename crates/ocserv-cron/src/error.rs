//! Scheduler error types.

use ocserv_store::StoreError;

/// Scheduler error type.
#[derive(Debug, thiserror::Error)]
pub enum CronError {
    /// A sweep selection failed; the run is not stamped.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("state file: {0}")]
    StateFile(String),
}
