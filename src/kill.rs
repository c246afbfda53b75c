//! Out-of-band termination commands.
//!
//! Killing does not go through the application connection, which may be gone
//! by the time the launcher is interrupted. Instead the cluster's own tooling
//! is invoked:
//!
//! | Cluster manager | Entry point | Arguments |
//! |-----------------|-------------|-----------|
//! | `yarn` | `yarn` CLI (falls back to the runner default if absent) | `application -kill <app id>` |
//! | anything else | runner default (`spark-submit`) | `--kill <app id>` |

use crate::entry_point::{EntryPoint, EntryPointResolver, YARN_CLI_ENTRY_POINT};
use crate::error::{LaunchError, LaunchResult};
use crate::runner::CommandRunner;
use crate::state::{AppId, ClusterManager};

/// Build the kill arguments for `app_id` on `cluster_manager`.
///
/// An absent application ID is rejected: the kill tools have no defined
/// behavior for a kill without a target.
pub fn kill_arguments(
    cluster_manager: Option<&ClusterManager>,
    app_id: Option<&AppId>,
) -> LaunchResult<Vec<String>> {
    let app_id = app_id.ok_or_else(|| {
        LaunchError::IllegalState("cannot kill an application with no application ID".into())
    })?;

    let mut args = match cluster_manager {
        Some(ClusterManager::Yarn) => vec!["application".to_string(), "-kill".to_string()],
        _ => vec!["--kill".to_string()],
    };
    args.push(app_id.to_string());
    Ok(args)
}

/// A fully prepared kill: the entry point to use (if one was found) and its
/// arguments.
#[derive(Debug)]
pub struct KillCommand {
    pub entry_point: Option<EntryPoint>,
    pub args: Vec<String>,
}

impl KillCommand {
    /// Prepare the kill for `app_id` on `cluster_manager`.
    ///
    /// For the orchestrator, its CLI is looked up in `resolver`. If it is not
    /// installed a warning is logged and the command carries no entry point,
    /// leaving the choice to the runner.
    pub fn prepare(
        resolver: &EntryPointResolver,
        cluster_manager: Option<&ClusterManager>,
        app_id: Option<&AppId>,
    ) -> LaunchResult<Self> {
        let args = kill_arguments(cluster_manager, app_id)?;

        let entry_point = match cluster_manager {
            Some(ClusterManager::Yarn) => match resolver.resolve(YARN_CLI_ENTRY_POINT) {
                Ok(ep) => Some(EntryPoint::Resolved(ep)),
                Err(e) if e.is_backend_missing() => {
                    tracing::warn!(error = %e, "Yarn CLI not available, using default entry point");
                    None
                }
                Err(e) => return Err(e),
            },
            _ => None,
        };

        Ok(Self { entry_point, args })
    }

    /// Run the kill exactly once, blocking until it completes.
    pub fn run(self, runner: &CommandRunner) -> LaunchResult<()> {
        runner.run(self.entry_point, &self.args)
    }
}
