//! The application handle state machine.
//!
//! An [`AppHandle`] is the launcher-side view of one remote application. The
//! transport feeding it reports calls [`AppHandle::set_state`] and
//! [`AppHandle::set_app_id`] (or [`AppHandle::handle_message`]); callers poll
//! the getters, register [`Listener`]s, and control the application with
//! [`AppHandle::stop`], [`AppHandle::kill`] and [`AppHandle::disconnect`].
//!
//! ## Locking
//!
//! - `dispatch` records which thread is currently mutating the handle and
//!   delivering notifications. Other threads wait for it to finish, so
//!   listeners observe changes one at a time and in order. The owning thread
//!   may re-enter (a listener calling `disconnect` on a final state); its
//!   nested notifications are queued and delivered after the current
//!   fan-out.
//! - `inner` guards the data and is held only for short reads and writes. It
//!   is released before listeners run, so listeners can read the handle.
//! - `connection` is locked on its own, so a slow `send` never blocks the
//!   getters or the thread delivering reports.
//!
//! Kills run with no lock held; they block on external tooling.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::config::LaunchConfig;
use crate::connection::Connection;
use crate::entry_point::EntryPointResolver;
use crate::error::{LaunchError, LaunchResult};
use crate::kill::KillCommand;
use crate::listener::Listener;
use crate::protocol::Message;
use crate::registry::{HandleRegistry, Registry};
use crate::relay::OutputRelay;
use crate::runner::CommandRunner;
use crate::state::{AppId, ClusterManager, State};

struct Inner {
    state: State,
    app_id: Option<AppId>,
    listeners: Vec<Arc<dyn Listener>>,
    disposed: bool,
    kill_if_interrupted: bool,
    cluster_manager: Option<ClusterManager>,
    relay: Option<Box<dyn OutputRelay>>,
}

#[derive(Clone, Copy)]
enum Event {
    StateChanged,
    InfoChanged,
}

/// An event together with the listeners registered when it happened.
struct Notification {
    event: Event,
    listeners: Vec<Arc<dyn Listener>>,
}

#[derive(Default)]
struct Dispatch {
    owner: Option<ThreadId>,
    pending: VecDeque<Notification>,
}

/// Launcher-side handle to a remote application.
pub struct AppHandle {
    secret: String,
    registry: Arc<dyn Registry>,
    runner: CommandRunner,
    dispatch: Mutex<Dispatch>,
    idle: Condvar,
    inner: Mutex<Inner>,
    connection: Mutex<Option<Box<dyn Connection>>>,
}

impl AppHandle {
    /// Create a handle owned by `registry`, identified by `secret`.
    ///
    /// Kills are run through a [`CommandRunner`] that resolves entry points
    /// on `PATH`; use [`with_runner`](Self::with_runner) to change that.
    pub fn new(registry: Arc<dyn Registry>, secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            registry,
            runner: CommandRunner::new(Arc::new(EntryPointResolver::with_path_search())),
            dispatch: Mutex::new(Dispatch::default()),
            idle: Condvar::new(),
            inner: Mutex::new(Inner {
                state: State::Unknown,
                app_id: None,
                listeners: Vec::new(),
                disposed: false,
                kill_if_interrupted: false,
                cluster_manager: None,
                relay: None,
            }),
            connection: Mutex::new(None),
        }
    }

    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Create a handle and register it with `registry`.
    pub fn create(registry: Arc<HandleRegistry>, secret: impl Into<String>) -> Arc<Self> {
        let handle = Arc::new(Self::new(registry.clone(), secret));
        registry.register(&handle);
        handle
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn set_kill_if_interrupted(&self, kill: bool) {
        self.lock().kill_if_interrupted = kill;
    }

    pub fn kills_if_interrupted(&self) -> bool {
        self.lock().kill_if_interrupted
    }

    pub fn set_cluster_manager(&self, cluster_manager: Option<ClusterManager>) {
        self.lock().cluster_manager = cluster_manager;
    }

    pub fn cluster_manager(&self) -> Option<ClusterManager> {
        self.lock().cluster_manager.clone()
    }

    /// Apply the kill flag and cluster manager from `config`.
    pub fn configure(&self, config: &LaunchConfig) {
        let mut inner = self.lock();
        inner.kill_if_interrupted = config.kill_if_interrupted;
        inner.cluster_manager = config.cluster_manager.clone();
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn state(&self) -> State {
        self.lock().state
    }

    /// The application ID, once the application has reported it.
    pub fn app_id(&self) -> Option<AppId> {
        self.lock().app_id.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Register a listener. Duplicates are kept and notified once per
    /// registration.
    pub fn add_listener(&self, listener: Arc<dyn Listener>) {
        self.serialized(|| {
            self.lock().listeners.push(listener);
            ((), None)
        })
    }

    // ── Wiring (used by the transport) ───────────────────────────────

    /// Attach the application's connection. The handle takes ownership and
    /// closes it on [`disconnect`](Self::disconnect).
    pub fn set_connection(&self, mut connection: Box<dyn Connection>) -> LaunchResult<()> {
        self.serialized(|| {
            if self.is_disposed() {
                self.close_quietly(&mut *connection);
                let err = LaunchError::IllegalState(
                    "Application handle is already disconnected.".into(),
                );
                return (Err(err), None);
            }
            let previous = self.connection().replace(connection);
            if let Some(mut previous) = previous {
                tracing::warn!(secret = %self.secret, "Replacing existing application connection");
                self.close_quietly(&mut *previous);
            }
            (Ok(()), None)
        })
    }

    /// Attach the relay forwarding the application's output. It is stopped
    /// on [`disconnect`](Self::disconnect).
    pub fn set_output_relay(&self, mut relay: Box<dyn OutputRelay>) {
        self.serialized(|| {
            let mut inner = self.lock();
            if inner.disposed {
                relay.stop();
            } else if let Some(mut previous) = inner.relay.replace(relay) {
                previous.stop();
            }
            ((), None)
        })
    }

    /// Record a state reported by the application.
    ///
    /// Transitions out of a final state, or after disposal, are dropped with
    /// a warning. Otherwise listeners get `state_changed`, in registration
    /// order, after the new state is visible.
    pub fn set_state(&self, state: State) {
        self.serialized(|| {
            let mut inner = self.lock();
            if inner.disposed {
                tracing::warn!(
                    secret = %self.secret,
                    %state,
                    "Ignoring state report for disconnected handle"
                );
                return ((), None);
            }
            if inner.state.is_final() {
                tracing::warn!(
                    from = %inner.state,
                    to = %state,
                    "Backend requested transition from final state"
                );
                return ((), None);
            }
            tracing::debug!(
                secret = %self.secret,
                from = %inner.state,
                to = %state,
                "Application state changed"
            );
            inner.state = state;
            ((), Some(Self::notification(&inner, Event::StateChanged)))
        })
    }

    /// Record the application ID reported by the application.
    ///
    /// Applies in any state, including final ones; listeners get
    /// `info_changed`.
    pub fn set_app_id(&self, app_id: AppId) {
        self.serialized(|| {
            let mut inner = self.lock();
            if inner.disposed {
                tracing::warn!(
                    secret = %self.secret,
                    %app_id,
                    "Ignoring app id report for disconnected handle"
                );
                return ((), None);
            }
            if let Some(previous) = inner.app_id.as_ref().filter(|p| **p != app_id) {
                tracing::warn!(%previous, %app_id, "Application id reassigned");
            }
            tracing::info!(secret = %self.secret, %app_id, "Application id assigned");
            inner.app_id = Some(app_id);
            ((), Some(Self::notification(&inner, Event::InfoChanged)))
        })
    }

    /// Apply a report received from the application.
    pub fn handle_message(&self, message: Message) -> LaunchResult<()> {
        match message {
            Message::SetAppId { app_id } => self.set_app_id(app_id),
            Message::SetState { state } => self.set_state(state),
            Message::Stop => {
                return Err(LaunchError::IllegalState(
                    "Unexpected STOP message from application.".into(),
                ));
            }
        }
        Ok(())
    }

    // ── Control ──────────────────────────────────────────────────────

    /// Ask the application to stop over its connection.
    ///
    /// The state is not changed here; the application reports its final
    /// state when it exits. Only the connection is locked while sending.
    pub fn stop(&self) -> LaunchResult<()> {
        let mut connection = self.connection();
        let connection = connection.as_mut().ok_or_else(|| {
            LaunchError::IllegalState("Application is still not connected.".into())
        })?;
        connection
            .send(&Message::Stop)
            .map_err(LaunchError::Communication)
    }

    /// Tear the handle down: close the connection, leave the registry and
    /// stop output relaying. Only the first call has any effect.
    ///
    /// Safe to call from a [`Listener`] callback.
    pub fn disconnect(&self) {
        self.serialized(|| {
            let relay = {
                let mut inner = self.lock();
                if inner.disposed {
                    return ((), None);
                }
                inner.disposed = true;
                inner.relay.take()
            };

            let connection = self.connection().take();
            if let Some(mut connection) = connection {
                self.close_quietly(&mut *connection);
            }
            self.registry.unregister(&self.secret);
            if let Some(mut relay) = relay {
                relay.stop();
            }
            ((), None)
        })
    }

    /// Kill the application with the cluster's own tooling, bypassing the
    /// connection. Blocks until the kill command completes.
    ///
    /// Fails with `IllegalState` before running anything if the application
    /// ID is not known yet.
    pub fn kill(&self) -> LaunchResult<()> {
        let (cluster_manager, app_id) = {
            let inner = self.lock();
            (inner.cluster_manager.clone(), inner.app_id.clone())
        };

        tracing::info!(
            cluster_manager = cluster_manager.as_ref().map(ClusterManager::tag),
            app_id = app_id.as_ref().map(AppId::as_str),
            "Killing application"
        );
        let command = KillCommand::prepare(
            self.runner.resolver(),
            cluster_manager.as_ref(),
            app_id.as_ref(),
        )?;
        command.run(&self.runner)?;
        tracing::info!(app_id = app_id.as_ref().map(AppId::as_str), "Kill command completed");
        Ok(())
    }

    /// Run [`kill`](Self::kill) if kill-on-interrupt is enabled. Returns
    /// whether a kill was issued.
    pub fn kill_if_interrupted(&self) -> LaunchResult<bool> {
        if !self.kills_if_interrupted() {
            return Ok(false);
        }
        self.kill()?;
        Ok(true)
    }

    /// Run `apply` exclusively with respect to other threads' mutations, then
    /// deliver the notification it produced.
    ///
    /// A call made by the thread already dispatching (i.e. from a listener)
    /// applies immediately and queues its notification behind the one being
    /// delivered.
    fn serialized<R>(&self, apply: impl FnOnce() -> (R, Option<Notification>)) -> R {
        let me = thread::current().id();
        let mut dispatch = self.dispatch();

        if dispatch.owner == Some(me) {
            drop(dispatch);
            let (result, notification) = apply();
            if let Some(notification) = notification {
                self.dispatch().pending.push_back(notification);
            }
            return result;
        }

        while dispatch.owner.is_some() {
            dispatch = self
                .idle
                .wait(dispatch)
                .unwrap_or_else(PoisonError::into_inner);
        }
        dispatch.owner = Some(me);
        drop(dispatch);

        let _owner = DispatchOwner(self);
        let (result, mut next) = apply();
        while let Some(notification) = next {
            self.fire(&notification);
            next = self.dispatch().pending.pop_front();
        }
        result
    }

    fn notification(inner: &Inner, event: Event) -> Notification {
        Notification {
            event,
            listeners: inner.listeners.clone(),
        }
    }

    fn fire(&self, notification: &Notification) {
        for listener in &notification.listeners {
            match notification.event {
                Event::StateChanged => listener.state_changed(self),
                Event::InfoChanged => listener.info_changed(self),
            }
        }
    }

    fn close_quietly(&self, connection: &mut dyn Connection) {
        if let Err(e) = connection.close() {
            tracing::debug!(
                secret = %self.secret,
                error = %e,
                "Error closing application connection"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> MutexGuard<'_, Option<Box<dyn Connection>>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases dispatch ownership, including when a listener panics.
struct DispatchOwner<'a>(&'a AppHandle);

impl Drop for DispatchOwner<'_> {
    fn drop(&mut self) {
        let mut dispatch = self.0.dispatch();
        dispatch.owner = None;
        dispatch.pending.clear();
        drop(dispatch);
        self.0.idle.notify_all();
    }
}

impl fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("AppHandle")
            .field("secret", &self.secret)
            .field("state", &inner.state)
            .field("app_id", &inner.app_id)
            .field("disposed", &inner.disposed)
            .finish()
    }
}
