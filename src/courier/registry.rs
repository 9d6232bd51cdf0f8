//! Pending-Request Registry
//!
//! Tracks callbacks whose requests are in flight, in dispatch order. Presence
//! here means "still running"; the sweep in [`PendingRegistry::cancel_all`]
//! removes every entry and trips its abort flag while holding the lock, so
//! anyone who later finds a callback missing also finds it aborted.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::callback::Callback;

#[derive(Debug, Default)]
pub struct PendingRegistry {
    pending: Mutex<Vec<Callback>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` unless an equal one is already pending
    ///
    /// Returns false when nothing was added: either a duplicate is pending or
    /// the callback already left the registry once and may not come back.
    pub fn register(&self, callback: &Callback) -> bool {
        if callback.is_retired() {
            log::warn!("Refusing to re-register retired callback {:?}", callback.url());
            return false;
        }

        let mut pending = self.lock();
        if pending.contains(callback) {
            log::debug!("Callback for {:?} already pending", callback.url());
            return false;
        }
        pending.push(callback.clone());
        true
    }

    /// Remove `callback` if present; returns whether anything was removed
    pub fn unregister(&self, callback: &Callback) -> bool {
        let mut pending = self.lock();
        match pending.iter().position(|c| c == callback) {
            Some(index) => {
                let removed = pending.remove(index);
                removed.retire();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, callback: &Callback) -> bool {
        self.lock().contains(callback)
    }

    /// Whether this very callback (not merely an equal one) is pending
    pub(crate) fn holds_exact(&self, callback: &Callback) -> bool {
        self.lock().iter().any(|c| c.same_request(callback))
    }

    /// Remove this very callback, leaving equal entries of other requests alone
    pub(crate) fn remove_exact(&self, callback: &Callback) -> bool {
        let mut pending = self.lock();
        match pending.iter().position(|c| c.same_request(callback)) {
            Some(index) => {
                pending.remove(index).retire();
                true
            }
            None => false,
        }
    }

    /// Drain every pending callback and abort it
    ///
    /// Returns the number of callbacks aborted.
    pub fn cancel_all(&self) -> usize {
        let mut pending = self.lock();
        let drained: Vec<Callback> = pending.drain(..).collect();
        for callback in &drained {
            callback.retire();
            callback.abort();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// URLs of pending requests in dispatch order
    pub fn pending_urls(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|c| c.url().map(str::to_string))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Callback>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
