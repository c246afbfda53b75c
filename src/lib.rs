//! Application launcher handles.
//!
//! This crate supervises applications that run somewhere else (a YARN
//! cluster, a standalone cluster, a child process). For each launched
//! application the launcher holds an [`AppHandle`]: it tracks the
//! application's lifecycle [`State`] and [`AppId`] as reports arrive, notifies
//! [`Listener`]s, and can stop the application over its [`Connection`] or kill
//! it with the cluster's own tooling when the connection cannot be relied on.
//!
//! # Overview
//!
//! - [`AppHandle`]: the state machine, plus `stop`, `kill` and `disconnect`
//! - [`State`]: `Unknown → Connected → Submitted → Running → Finished | Failed | Killed`
//! - [`Listener`]: synchronous `state_changed` / `info_changed` callbacks
//! - [`Invokable`] / [`EntryPointResolver`] / [`CommandRunner`]: external
//!   tools (`spark-submit`, the `yarn` CLI) invoked by name
//! - [`KillCommand`]: cluster-manager-specific kill arguments
//! - [`shutdown`]: kill-on-interrupt wiring for SIGINT/SIGTERM
//! - [`monitor`]: caller-side polling with timeouts
//! - [`LaunchError`] with the launcher's error taxonomy
//!
//! # Lifecycle
//!
//! ```text
//!   create() ──→ configure() ──→ set_connection() ──→ reports ──→ disconnect()
//!                                                       │
//!                                  stop() / kill() ─────┘
//! ```
//!
//! ```ignore
//! use app_launcher::{AppHandle, HandleRegistry, LaunchConfig, monitor};
//!
//! let registry = HandleRegistry::new();
//! let handle = AppHandle::create(registry, "secret");
//! handle.configure(&LaunchConfig::from_env()?);
//! let token = app_launcher::shutdown::install_interrupt_handler(vec![handle.clone()]);
//! // ... the transport attaches a connection and feeds reports ...
//! let state = monitor::wait_for_final(&handle, interval, timeout).await?;
//! handle.disconnect();
//! ```

pub mod config;
pub mod connection;
pub mod entry_point;
pub mod error;
pub mod handle;
pub mod kill;
pub mod listener;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod runner;
pub mod shutdown;
pub mod state;

pub use config::LaunchConfig;
pub use connection::{Connection, WriterConnection};
pub use entry_point::{
    EntryPoint, EntryPointResolver, FnEntryPoint, Invokable, ProcessEntryPoint,
    SUBMIT_ENTRY_POINT, YARN_CLI_ENTRY_POINT,
};
pub use error::{BoxError, LaunchError, LaunchResult};
pub use handle::AppHandle;
pub use kill::{KillCommand, kill_arguments};
pub use listener::Listener;
pub use protocol::Message;
pub use registry::{HandleRegistry, Registry};
pub use relay::{LineRelay, OutputRelay};
pub use runner::CommandRunner;
pub use state::{AppId, ClusterManager, State};
