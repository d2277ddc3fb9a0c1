// Server module entry
// Listener setup, connection handling, and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

pub use listener::create_reusable_listener;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::AppState;
use crate::logger;
use connection::accept_connection;
use signal::SignalHandler;

/// Accept connections until a shutdown signal arrives.
///
/// Only the accept loop stops on shutdown; in-flight connections are left
/// to finish on their own.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let signals = Arc::new(SignalHandler::new());
    signal::start_signal_handler(Arc::clone(&signals));

    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = signals.shutdown.notified() => {
                logger::log_shutdown();
                break;
            }
        }
    }

    Ok(())
}
