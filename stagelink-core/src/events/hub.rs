//! Per-user observer routing
//!
//! One deployment hosts many logged-in users; each user registers their
//! own observers. The hub keys one [`ObserverRegistry`] per user so a
//! state change can be fanned out to exactly the affected users (one, a
//! room's members, or everyone who subscribed).

use dashmap::DashMap;
use std::sync::Arc;

use super::registry::{DuplicatePolicy, ObserverRegistry};
use crate::models::UserId;

pub struct ObserverHub<T: ?Sized> {
    registries: DashMap<UserId, Arc<ObserverRegistry<T>>>,
    policy: DuplicatePolicy,
}

impl<T: ?Sized> ObserverHub<T> {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            registries: DashMap::new(),
            policy,
        }
    }

    /// Registry for one user, created on first use
    pub fn registry_for(&self, user: &UserId) -> Arc<ObserverRegistry<T>> {
        self.registries
            .entry(user.clone())
            .or_insert_with(|| Arc::new(ObserverRegistry::new(self.policy)))
            .clone()
    }

    pub fn add_observer(&self, user: &UserId, observer: Arc<T>) {
        self.registry_for(user).add_observer(observer);
    }

    pub fn remove_observer(&self, user: &UserId, observer: &Arc<T>) {
        if let Some(registry) = self.registries.get(user) {
            registry.remove_observer(observer);
        }
    }

    /// Drop every registration of a user (logout cleanup)
    pub fn drop_user(&self, user: &UserId) {
        self.registries.remove(user);
    }

    /// Deliver to one user's observers
    pub fn notify_user(&self, user: &UserId, deliver: impl Fn(&T)) {
        if let Some(registry) = self.registries.get(user) {
            registry.notify(&deliver);
        }
    }

    /// Deliver to several users' observers
    pub fn notify_users<'a>(
        &self,
        users: impl IntoIterator<Item = &'a UserId>,
        deliver: impl Fn(&T),
    ) {
        for user in users {
            self.notify_user(user, &deliver);
        }
    }
}

impl<T: ?Sized> Default for ObserverHub<T> {
    fn default() -> Self {
        Self::new(DuplicatePolicy::DeliverTwice)
    }
}

impl<T: ?Sized> std::fmt::Debug for ObserverHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHub")
            .field("users", &self.registries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Probe: Send + Sync {
        fn hit(&self);
    }

    struct Counting(AtomicUsize);

    impl Probe for Counting {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_routing_is_per_user() {
        let hub: ObserverHub<dyn Probe> = ObserverHub::default();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let a = Arc::new(Counting(AtomicUsize::new(0)));
        let b = Arc::new(Counting(AtomicUsize::new(0)));
        hub.add_observer(&alice, a.clone());
        hub.add_observer(&bob, b.clone());

        hub.notify_user(&alice, |o| o.hit());
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 0);

        hub.notify_users([&alice, &bob], |o| o.hit());
        assert_eq!(a.0.load(Ordering::SeqCst), 2);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_user_stops_delivery() {
        let hub: ObserverHub<dyn Probe> = ObserverHub::default();
        let alice = UserId::from("alice");
        let a = Arc::new(Counting(AtomicUsize::new(0)));
        hub.add_observer(&alice, a.clone());

        hub.drop_user(&alice);
        hub.notify_user(&alice, |o| o.hit());

        assert_eq!(a.0.load(Ordering::SeqCst), 0);
    }
}
