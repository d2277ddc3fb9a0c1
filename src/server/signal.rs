// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Signal handler state
pub struct SignalHandler {
    /// Shutdown signal (SIGTERM, SIGINT)
    pub shutdown: Arc<Notify>,
    /// Whether shutdown has been requested
    pub shutdown_requested: Arc<AtomicBool>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the signal listener task (Unix).
///
/// Notifies `handler.shutdown` once a termination signal arrives.
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                logger::log_error(&format!("Failed to install SIGTERM handler: {e}"));
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                logger::log_error(&format!("Failed to install SIGINT handler: {e}"));
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }

        handler.shutdown_requested.store(true, Ordering::SeqCst);
        handler.shutdown.notify_waiters();
    });
}

/// Start the signal listener task (non-Unix fallback: Ctrl+C only).
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            return;
        }
        handler.shutdown_requested.store(true, Ordering::SeqCst);
        handler.shutdown.notify_waiters();
    });
}
