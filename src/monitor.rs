//! Caller-side polling of handles.
//!
//! A handle never blocks; these helpers poll its getters on an interval until
//! the awaited condition holds or the deadline passes.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::{LaunchError, LaunchResult};
use crate::handle::AppHandle;
use crate::state::{AppId, State};

/// Wait until the application reports its ID.
pub async fn wait_for_app_id(
    handle: &AppHandle,
    poll_interval: Duration,
    timeout: Duration,
) -> LaunchResult<AppId> {
    poll(handle, poll_interval, timeout, "application id", |h| h.app_id()).await
}

/// Wait until the application reaches a final state, and return it.
pub async fn wait_for_final(
    handle: &AppHandle,
    poll_interval: Duration,
    timeout: Duration,
) -> LaunchResult<State> {
    poll(handle, poll_interval, timeout, "final state", |h| {
        let state = h.state();
        state.is_final().then_some(state)
    })
    .await
}

async fn poll<T>(
    handle: &AppHandle,
    poll_interval: Duration,
    timeout: Duration,
    what: &str,
    check: impl Fn(&AppHandle) -> Option<T>,
) -> LaunchResult<T> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = check(handle) {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(LaunchError::Timeout(format!(
                "{what} of {} (state {})",
                handle.secret(),
                handle.state()
            )));
        }
        tracing::trace!(secret = handle.secret(), state = %handle.state(), "Waiting for {what}");
        sleep(poll_interval).await;
    }
}
