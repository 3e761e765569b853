//! OS signal handling.
//!
//! SIGTERM and SIGINT both request a graceful shutdown. If a handler cannot
//! be installed the corresponding signal is ignored rather than treated as
//! received.

use std::future::pending;

/// Wait for the first termination signal and return its name.
#[cfg(unix)]
pub async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c() => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Wait for Ctrl+C and return its name.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> &'static str {
    ctrl_c().await;
    "ctrl-c"
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        pending::<()>().await;
    }
}
