//! Killing applications when the launcher is interrupted.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{LaunchError, LaunchResult};
use crate::handle::AppHandle;

/// Install a handler that listens for SIGINT and SIGTERM and then kills every
/// handle in `handles` that has kill-on-interrupt enabled.
///
/// Returns a `CancellationToken` that is cancelled once all kill commands have
/// completed. The process should not exit on interrupt before the token is
/// cancelled.
pub fn install_interrupt_handler(handles: Vec<Arc<AppHandle>>) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        terminate_on(interrupted(), handles).await;
        token_clone.cancel();
    });

    token
}

/// Wait for `signal`, then run [`kill_all`].
pub async fn terminate_on<F>(signal: F, handles: Vec<Arc<AppHandle>>) -> Vec<LaunchResult<bool>>
where
    F: Future<Output = ()>,
{
    signal.await;
    kill_all(handles).await
}

/// Run [`AppHandle::kill_if_interrupted`] for each handle, one at a time, on
/// the blocking pool. Each result says whether a kill was issued.
pub async fn kill_all(handles: Vec<Arc<AppHandle>>) -> Vec<LaunchResult<bool>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let secret = handle.secret().to_string();
        let result = tokio::task::spawn_blocking(move || handle.kill_if_interrupted())
            .await
            .unwrap_or_else(|e| Err(LaunchError::runtime_failure("kill task", e)));
        if let Err(e) = &result {
            tracing::error!(secret, error = %e, "Failed to kill application on interrupt");
        }
        results.push(result);
    }
    results
}

#[cfg(unix)]
async fn interrupted() {
    use tokio::signal::unix::SignalKind;

    tokio::select! {
        _ = recv_signal(SignalKind::terminate(), "SIGTERM") => {
            tracing::info!("Received SIGTERM, killing applications");
        }
        _ = recv_signal(SignalKind::interrupt(), "SIGINT") => {
            tracing::info!("Received SIGINT, killing applications");
        }
    }
}

#[cfg(unix)]
async fn recv_signal(kind: tokio::signal::unix::SignalKind, name: &'static str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            tracing::error!(signal = name, error = %e, "Failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, killing applications"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
