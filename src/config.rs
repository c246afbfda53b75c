//! Configuration loading from environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::entry_point::SUBMIT_ENTRY_POINT;
use crate::error::{LaunchError, LaunchResult};
use crate::state::ClusterManager;

/// Launcher configuration applied to handles before submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Cluster manager the application is submitted to. `None` behaves like
    /// any non-orchestrator backend.
    pub cluster_manager: Option<ClusterManager>,
    /// Kill the application when the launcher is interrupted.
    pub kill_if_interrupted: bool,
    /// Interval for callers polling a handle.
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Entry point used when no backend-specific one applies. Applied through
    /// [`CommandRunner::from_config`](crate::CommandRunner::from_config).
    pub submit_entry_point: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            cluster_manager: None,
            kill_if_interrupted: false,
            poll_interval: Duration::from_millis(1000),
            submit_entry_point: SUBMIT_ENTRY_POINT.to_string(),
        }
    }
}

impl LaunchConfig {
    /// Load configuration from environment variables.
    ///
    /// All optional:
    /// - `LAUNCHER_MASTER`: cluster manager tag (default: none)
    /// - `LAUNCHER_KILL_ON_INTERRUPT`: `true`/`false`/`1`/`0` (default: false)
    /// - `LAUNCHER_POLL_INTERVAL_MS`: polling interval (default: 1000)
    /// - `LAUNCHER_SUBMIT_ENTRY_POINT`: default entry point (default: `spark-submit`)
    pub fn from_env() -> LaunchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LaunchResult<Self> {
        let defaults = Self::default();

        let cluster_manager = lookup("LAUNCHER_MASTER")
            .filter(|tag| !tag.is_empty())
            .map(|tag| ClusterManager::from_tag(&tag));

        let kill_if_interrupted = match lookup("LAUNCHER_KILL_ON_INTERRUPT").as_deref() {
            None => defaults.kill_if_interrupted,
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            Some(_) => {
                return Err(LaunchError::Configuration(
                    "LAUNCHER_KILL_ON_INTERRUPT must be true, false, 1 or 0".into(),
                ));
            }
        };

        let poll_interval = match lookup("LAUNCHER_POLL_INTERVAL_MS") {
            None => defaults.poll_interval,
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(LaunchError::Configuration(
                        "LAUNCHER_POLL_INTERVAL_MS must be a positive integer".into(),
                    ));
                }
            },
        };

        let submit_entry_point = lookup("LAUNCHER_SUBMIT_ENTRY_POINT")
            .filter(|name| !name.is_empty())
            .unwrap_or(defaults.submit_entry_point);

        Ok(Self {
            cluster_manager,
            kill_if_interrupted,
            poll_interval,
            submit_entry_point,
        })
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
