//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or SIGTERM
//! - Report handler installation failures instead of hanging

use std::io;

use thiserror::Error;
use tokio::signal;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to install Ctrl+C handler: {0}")]
    CtrlC(#[source] io::Error),

    #[cfg(unix)]
    #[error("failed to install SIGTERM handler: {0}")]
    SigTerm(#[source] io::Error),
}

/// Resolve once the process is asked to stop.
pub async fn wait_for_signal() -> Result<(), SignalError> {
    let ctrl_c = async { signal::ctrl_c().await.map_err(SignalError::CtrlC) };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(SignalError::SigTerm)?
            .recv()
            .await;
        Ok::<(), SignalError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), SignalError>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            tracing::info!("ctrl_c signal received");
        }
        result = terminate => {
            result?;
            tracing::info!("terminate signal received");
        }
    }

    Ok(())
}
