//! Launcher error types.
//!
//! Errors are categorized by who has to act on them:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Usage** | `IllegalState` | Finish setup first (connect, wait for an app id) |
//! | **Transport** | `Communication`, `Protocol` | Caller decides; never retried here |
//! | **Backend lookup** | `NotFound`, `NoSuchEntryPoint` | Logged; kill falls back to the default entry point |
//! | **Invocation** | `RuntimeFailure` | Always surfaced; the remote job may be orphaned |
//! | **Caller-side** | `Timeout`, `Configuration` | Fix configuration or wait longer |

use thiserror::Error;

/// Boxed cause carried by [`LaunchError::RuntimeFailure`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while supervising an application.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaunchError {
    // ── Usage errors ─────────────────────────────────────────────────
    /// Operation attempted before its prerequisite was in place.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    // ── Transport errors ─────────────────────────────────────────────
    /// Failure sending over the application connection.
    #[error("Communication error: {0}")]
    Communication(#[source] std::io::Error),

    /// Malformed message on the application connection.
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    // ── Backend lookup errors ────────────────────────────────────────
    /// The backend providing the entry point is not installed.
    #[error("Entry point not found: {0}")]
    NotFound(String),

    /// The name resolved, but not to something that can be invoked.
    #[error("No such entry point: {0}")]
    NoSuchEntryPoint(String),

    // ── Invocation errors ────────────────────────────────────────────
    /// Invoking an external entry point failed.
    #[error("Failed to run {entry_point}: {source}")]
    RuntimeFailure {
        entry_point: String,
        #[source]
        source: BoxError,
    },

    // ── Caller-side errors ───────────────────────────────────────────
    /// Timed out waiting on a handle.
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LaunchError {
    /// Returns `true` if the backend needed for an entry point is absent or
    /// misconfigured.
    pub fn is_backend_missing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoSuchEntryPoint(_))
    }

    pub(crate) fn runtime_failure(
        entry_point: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::RuntimeFailure {
            entry_point: entry_point.into(),
            source: source.into(),
        }
    }
}

/// Result type for launcher operations.
pub type LaunchResult<T> = Result<T, LaunchError>;
