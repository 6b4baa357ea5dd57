//! Process shutdown wiring.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wait for shutdown signals (SIGTERM, SIGINT).
pub async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            // Fall back to waiting forever
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Create the process-wide shutdown token, cancelled on SIGINT/SIGTERM.
///
/// Must be called from within a tokio runtime.
pub fn shutdown_token() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal_handler() => info!("shutdown signal received"),
            _ = shutdown_signal.cancelled() => {}
        }
        shutdown_signal.cancel();
    });
    shutdown
}
