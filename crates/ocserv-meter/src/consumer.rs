//! Sequential log consumer.

use ocserv_ctl::CredentialStore;
use ocserv_store::UserStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::AccountingEngine;
use crate::error::MeterError;
use crate::extract::{Extracted, extract};

/// Counters for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterStats {
    pub lines: u64,
    pub accounted: u64,
    pub rejected: u64,
}

/// Drain `lines` through the extractor into `engine`.
///
/// Lines are handled one at a time, so events for one user are accounted
/// in the order they were logged. Shutdown is observed between lines. The
/// server shutdown marker cancels `shutdown` and returns
/// [`MeterError::UpstreamShutdown`].
pub async fn consume<S, C>(
    engine: &AccountingEngine<S, C>,
    mut lines: mpsc::Receiver<String>,
    shutdown: CancellationToken,
) -> Result<MeterStats, MeterError>
where
    S: UserStore,
    C: CredentialStore,
{
    let mut stats = MeterStats::default();

    loop {
        let line = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("log consumer shutting down");
                return Ok(stats);
            }

            line = lines.recv() => line,
        };
        let Some(line) = line else {
            info!(lines = stats.lines, "log source closed");
            return Ok(stats);
        };
        stats.lines += 1;

        let event = match extract(&line) {
            Ok(Extracted::Disconnect(event)) => event,
            Ok(Extracted::NoEvent) => continue,
            Ok(Extracted::FatalSignal) => {
                error!("ocserv server shut down, stopping");
                shutdown.cancel();
                return Err(MeterError::UpstreamShutdown);
            }
            Err(e) => {
                stats.rejected += 1;
                warn!(kind = e.kind(), error = %e, "discarding log line");
                continue;
            }
        };

        match engine.on_event(&event).await {
            Ok(out) => {
                stats.accounted += 1;
                info!(
                    username = %out.username,
                    rx = event.rx,
                    tx = event.tx,
                    locked = out.is_locked,
                    "traffic accounted"
                );
            }
            Err(e) => {
                stats.rejected += 1;
                warn!(
                    username = %event.username,
                    kind = e.kind(),
                    error = %e,
                    "failed to account traffic"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ocserv_ctl::RecordingCredentials;
    use ocserv_store::{MemoryStore, User};

    use super::*;

    fn engine() -> (
        AccountingEngine<Arc<MemoryStore>, RecordingCredentials>,
        Arc<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::from_users([User::new(1, "alice")]));
        (
            AccountingEngine::new(store.clone(), RecordingCredentials::new()),
            store,
        )
    }

    async fn feed(lines: &[&str]) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            tx.send(line.to_string()).await.unwrap();
        }
        rx
    }

    #[tokio::test]
    async fn consumes_until_source_closes() {
        let (engine, store) = engine();
        let rx = feed(&[
            "main[alice] user disconnected rx: 10, tx: 20",
            "main[alice] user logged in",
            "main[ghost] user disconnected rx: 1, tx: 1",
            "main[alice] user disconnected (no counters)",
            "main[alice] user disconnected rx: 5, tx: 5",
        ])
        .await;

        let stats = consume(&engine, rx, CancellationToken::new()).await.unwrap();
        assert_eq!(
            stats,
            MeterStats {
                lines: 5,
                accounted: 2,
                rejected: 2,
            }
        );
        let alice = store.user(1).unwrap();
        assert_eq!((alice.rx_bytes, alice.tx_bytes), (15, 25));
    }

    #[tokio::test]
    async fn server_shutdown_is_fatal_and_cancels() {
        let (engine, store) = engine();
        let rx = feed(&[
            "main: server shutdown complete",
            "main[alice] user disconnected rx: 10, tx: 20",
        ])
        .await;
        let shutdown = CancellationToken::new();

        let err = consume(&engine, rx, shutdown.clone()).await.unwrap_err();
        assert!(matches!(err, MeterError::UpstreamShutdown));
        assert!(shutdown.is_cancelled());
        assert!(store.samples().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_stops_consumer() {
        let (engine, _) = engine();
        let (_tx, rx) = mpsc::channel::<String>(1);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let stats = consume(&engine, rx, shutdown).await.unwrap();
        assert_eq!(stats.lines, 0);
    }
}
