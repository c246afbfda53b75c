//! Application lifecycle types.
//!
//! The handle state machine:
//!
//! ```text
//!   Unknown ──→ Connected ──→ Submitted ──→ Running ──→ Finished
//!                                             │
//!                                             ├──→ Failed
//!                                             │
//!                                             └──→ Killed
//! ```
//!
//! **Invariants:**
//! - Every handle starts in `Unknown`.
//! - Final states (`Finished`, `Failed`, `Killed`) are permanent.
//! - Any non-final state may be followed by any other state; the remote side
//!   decides the order.

use serde::{Deserialize, Serialize};

/// Tag selecting the orchestrator-specific kill command shape.
pub const YARN_TAG: &str = "yarn";

/// Identifier the remote cluster assigned to the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppId(pub String);

impl AppId {
    /// Create a new application ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AppId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a launched application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// No report has been received yet.
    #[default]
    Unknown,
    /// The application has connected back to the launcher.
    Connected,
    /// The application has been submitted to the cluster.
    Submitted,
    /// The application is running.
    Running,
    /// The application finished successfully.
    Finished,
    /// The application failed.
    Failed,
    /// The application was killed.
    Killed,
}

impl State {
    /// Check if this is a final state. No transition leaves a final state.
    pub fn is_final(&self) -> bool {
        matches!(self, State::Finished | State::Failed | State::Killed)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Unknown => "UNKNOWN",
            State::Connected => "CONNECTED",
            State::Submitted => "SUBMITTED",
            State::Running => "RUNNING",
            State::Finished => "FINISHED",
            State::Failed => "FAILED",
            State::Killed => "KILLED",
        };
        f.write_str(name)
    }
}

/// Backend executing the remote application.
///
/// Only the orchestrator tag changes behavior (the kill command shape); every
/// other tag is carried through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterManager {
    Yarn,
    Other(String),
}

impl ClusterManager {
    pub fn from_tag(tag: &str) -> Self {
        if tag == YARN_TAG {
            ClusterManager::Yarn
        } else {
            ClusterManager::Other(tag.to_string())
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            ClusterManager::Yarn => YARN_TAG,
            ClusterManager::Other(tag) => tag,
        }
    }

    pub fn is_yarn(&self) -> bool {
        matches!(self, ClusterManager::Yarn)
    }
}

impl From<String> for ClusterManager {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<ClusterManager> for String {
    fn from(cm: ClusterManager) -> Self {
        cm.tag().to_string()
    }
}

impl std::fmt::Display for ClusterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
