//! Process-wide tracking of live handles.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use rustc_hash::FxHashMap;

use crate::handle::AppHandle;

/// Owner of a set of handles, keyed by the secret each handle was created with.
pub trait Registry: Send + Sync {
    /// Forget the handle registered under `secret`. Unknown secrets are ignored.
    fn unregister(&self, secret: &str);
}

/// In-memory registry of live handles.
///
/// Entries are weak: the registry never keeps a handle alive on its own.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    handles: Mutex<FxHashMap<String, Weak<AppHandle>>>,
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Track `handle` under its secret, replacing any stale entry.
    ///
    /// Entries whose handle has been dropped without disconnecting are
    /// pruned here.
    pub fn register(&self, handle: &Arc<AppHandle>) {
        let mut handles = self.lock();
        handles.retain(|_, h| h.strong_count() > 0);
        handles.insert(handle.secret().to_string(), Arc::downgrade(handle));
    }

    /// Look up a live handle by secret.
    pub fn get(&self, secret: &str) -> Option<Arc<AppHandle>> {
        self.lock().get(secret).and_then(Weak::upgrade)
    }

    /// Number of registered handles that are still alive.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|h| h.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Weak<AppHandle>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Registry for HandleRegistry {
    fn unregister(&self, secret: &str) {
        if self.lock().remove(secret).is_some() {
            tracing::debug!(secret, "Unregistered application handle");
        }
    }
}
