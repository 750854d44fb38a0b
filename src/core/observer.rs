//! Multi-subscriber observer lists for state lifecycle notifications.

use super::id::StateId;
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked with the id of the state that changed.
pub type Observer = Arc<dyn Fn(StateId) + Send + Sync>;

/// Handle for unsubscribing a previously added observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

/// An ordered list of observers with explicit unsubscribe.
///
/// Observers are invoked in registration order. Removing one does not
/// affect the relative order of the rest.
///
/// # Example
///
/// ```
/// use cascade::core::{ObserverSet, StateId};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let mut set = ObserverSet::new();
/// let calls = Arc::new(AtomicUsize::new(0));
///
/// let counter = calls.clone();
/// let id = set.add(move |_| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
///
/// set.notify(StateId::new());
/// assert_eq!(calls.load(Ordering::Relaxed), 1);
///
/// assert!(set.remove(id));
/// set.notify(StateId::new());
/// assert_eq!(calls.load(Ordering::Relaxed), 1);
/// ```
#[derive(Clone, Default)]
pub struct ObserverSet {
    entries: Vec<(ObserverId, Observer)>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer, returning a handle for later removal.
    pub fn add<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(StateId) + Send + Sync + 'static,
    {
        let id = ObserverId(Uuid::new_v4());
        self.entries.push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer by handle. Returns whether it was present.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Invoke every observer in registration order.
    pub fn notify(&self, state: StateId) {
        for (_, observer) in &self.entries {
            observer(state);
        }
    }

    /// Snapshot the observer callbacks in registration order.
    ///
    /// The runtime invokes observers from the snapshot so that an
    /// observer mutating the machine does not alias the node it was
    /// registered on.
    pub fn handlers(&self) -> Vec<Observer> {
        self.entries.iter().map(|(_, obs)| obs.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn observers_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = ObserverSet::new();

        for tag in ["a", "b", "c"] {
            let log = log.clone();
            set.add(move |_| log.lock().unwrap().push(tag));
        }

        set.notify(StateId::new());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn removed_observer_no_longer_fires() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = ObserverSet::new();

        let keep = log.clone();
        set.add(move |_| keep.lock().unwrap().push("keep"));

        let drop = log.clone();
        let id = set.add(move |_| drop.lock().unwrap().push("drop"));

        assert!(set.remove(id));
        set.notify(StateId::new());

        assert_eq!(*log.lock().unwrap(), vec!["keep"]);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut set = ObserverSet::new();
        set.add(|_| {});

        let mut other = ObserverSet::new();
        let foreign = other.add(|_| {});

        assert!(!set.remove(foreign));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn observer_receives_the_state_id() {
        let seen = Arc::new(Mutex::new(None));
        let mut set = ObserverSet::new();

        let slot = seen.clone();
        set.add(move |id| *slot.lock().unwrap() = Some(id));

        let state = StateId::new();
        set.notify(state);

        assert_eq!(*seen.lock().unwrap(), Some(state));
    }
}
