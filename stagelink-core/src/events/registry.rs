//! Observer registry
//!
//! Holds the subscriber set for one event surface and delivers
//! notifications to a snapshot of it. Subscribers manage their own
//! lifetime; the registry never owns them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// What to do when the same observer is registered twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep both registrations; the observer receives every event twice
    DeliverTwice,
    /// Ignore the second registration
    Dedupe,
}

/// Subscriber set for one event surface.
///
/// Delivery is synchronous relative to the triggering state change and
/// runs against a snapshot taken before the first callback, so observers
/// may add or remove registrations from inside a handler without
/// affecting the in-flight notification. No delivery order is guaranteed.
pub struct ObserverRegistry<T: ?Sized> {
    observers: RwLock<Vec<Arc<T>>>,
    policy: DuplicatePolicy,
}

impl<T: ?Sized> ObserverRegistry<T> {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            policy,
        }
    }

    /// Register an observer.
    ///
    /// Under [`DuplicatePolicy::DeliverTwice`] a repeated registration
    /// yields duplicate delivery; under [`DuplicatePolicy::Dedupe`] it is
    /// ignored.
    pub fn add_observer(&self, observer: Arc<T>) {
        let mut observers = self.observers.write();
        if self.policy == DuplicatePolicy::Dedupe
            && observers.iter().any(|o| Arc::ptr_eq(o, &observer))
        {
            return;
        }
        observers.push(observer);
    }

    /// Remove one registration of an observer.
    ///
    /// Removing an observer that is not registered is a harmless no-op.
    pub fn remove_observer(&self, observer: &Arc<T>) {
        let mut observers = self.observers.write();
        if let Some(pos) = observers.iter().position(|o| Arc::ptr_eq(o, observer)) {
            observers.remove(pos);
        }
    }

    /// Number of current registrations
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Deliver an event to every currently-registered observer.
    ///
    /// A panicking observer does not prevent delivery to the rest.
    pub fn notify(&self, deliver: impl Fn(&T)) {
        let snapshot: Vec<Arc<T>> = self.observers.read().clone();
        for observer in snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| deliver(&observer)));
            if result.is_err() {
                tracing::warn!("observer panicked during event delivery, skipping");
            }
        }
    }
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new(DuplicatePolicy::DeliverTwice)
    }
}

impl<T: ?Sized> std::fmt::Debug for ObserverRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}
