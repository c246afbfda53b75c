//! Observers of application handles.

use crate::handle::AppHandle;

/// Receives change notifications from an [`AppHandle`].
///
/// Callbacks run synchronously on the thread that applied the change, after
/// the change is visible through the handle's getters. A callback may read the
/// handle, mutate it or call [`AppHandle::disconnect`]. Notifications caused
/// by such nested calls are delivered after the current one has reached every
/// listener.
pub trait Listener: Send + Sync {
    /// The handle's state changed.
    fn state_changed(&self, handle: &AppHandle);

    /// The handle's application ID (or other info) changed.
    fn info_changed(&self, handle: &AppHandle);
}
