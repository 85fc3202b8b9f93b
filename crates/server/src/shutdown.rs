//! Signal handling.
//!
//! The first SIGINT or SIGTERM cancels the returned token so the harvest
//! loop can finish its current batch and persist the cursor. A second
//! signal exits immediately.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let count = Arc::new(AtomicU32::new(0));

    let handler_token = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => Some(sigterm),
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                None
            }
        };

        loop {
            #[cfg(unix)]
            {
                let terminate = async {
                    match sigterm.as_mut() {
                        Some(s) => {
                            s.recv().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    result = signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!(error = %e, "Failed to listen for Ctrl+C");
                            return;
                        }
                    }
                    _ = terminate => {}
                }
            }

            #[cfg(not(unix))]
            {
                if let Err(e) = signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                    return;
                }
            }

            if count.fetch_add(1, Ordering::SeqCst) == 0 {
                info!("Shutdown requested, finishing current batch");
                info!("Press Ctrl+C again to force exit");
                handler_token.cancel();
            } else {
                warn!("Force exit requested");
                std::process::exit(130);
            }
        }
    });

    token
}
