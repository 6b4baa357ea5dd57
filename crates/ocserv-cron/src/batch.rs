//! Bounded-concurrency fan-out of per-user actions.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use ocserv_core::DEFAULT_BATCH_WIDTH;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Outcome counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs an action over many items with at most `width` in flight.
///
/// Item failures, panics included, are counted and logged; they never cancel
/// the rest of the batch. No ordering between items.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    width: usize,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_WIDTH)
    }
}

impl BatchExecutor {
    /// A width of zero is treated as one.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Apply `action` to every item and wait for all of them.
    pub async fn run<T, F, Fut, E>(&self, items: Vec<T>, action: F) -> BatchReport
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let mut report = BatchReport {
            total: items.len(),
            ..BatchReport::default()
        };
        let semaphore = Arc::new(Semaphore::new(self.width));
        let mut tasks = JoinSet::new();

        for item in items {
            // Permit first, then spawn: at most `width` tasks exist at once.
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "batch semaphore closed");
                    report.failed += 1;
                    continue;
                }
            };
            let fut = action(item);
            tasks.spawn(async move {
                let _permit = permit;
                fut.await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => report.succeeded += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(error = %e, "batch item failed");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "batch item panicked");
                }
            }
        }

        debug!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "batch finished"
        );
        report
    }
}
