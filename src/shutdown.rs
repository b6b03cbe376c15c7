//! Signal handling for the long-running service.
//!
//! The first SIGINT, SIGTERM or SIGHUP cancels the returned token: the
//! scheduler stops firing and waits for an in-flight rename run. A second
//! signal exits immediately with status 130.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Exit status used when a second signal forces termination.
pub(crate) const FORCED_EXIT_CODE: i32 = 130;

/// What a received signal should do, given how many came before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalAction {
    Drain,
    ForceExit,
}

fn action_for(previous: u32) -> SignalAction {
    if previous == 0 {
        SignalAction::Drain
    } else {
        SignalAction::ForceExit
    }
}

/// Register signal listeners and return a token cancelled by the first
/// signal. Listener registration errors are returned, not panicked on.
pub(crate) fn install_signal_handler() -> std::io::Result<CancellationToken> {
    #[cfg(unix)]
    let (mut sigterm, mut sighup) = {
        use tokio::signal::unix::{signal, SignalKind};
        (
            signal(SignalKind::terminate())?,
            signal(SignalKind::hangup())?,
        )
    };

    let token = CancellationToken::new();
    let received = Arc::new(AtomicU32::new(0));
    let handler_token = token.clone();

    tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            let outcome = tokio::select! {
                r = tokio::signal::ctrl_c() => r,
                _ = sigterm.recv() => Ok(()),
                _ = sighup.recv() => Ok(()),
            };
            #[cfg(not(unix))]
            let outcome = tokio::signal::ctrl_c().await;

            if let Err(e) = outcome {
                tracing::error!(error = %e, "Signal listener failed; shutting down");
                handler_token.cancel();
                return;
            }

            match action_for(received.fetch_add(1, Ordering::SeqCst)) {
                SignalAction::Drain => {
                    tracing::info!("Shutdown requested, letting the current rename run finish...");
                    tracing::info!("Send the signal again to exit immediately");
                    handler_token.cancel();
                }
                SignalAction::ForceExit => {
                    tracing::warn!("Forced exit requested");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    });

    Ok(token)
}
