//! Owning store for the live constraint set.
//!
//! The store is the single owner of all constraints of one kind; the UI and
//! undo/redo layers create and destroy constraints only through it. Each
//! mutation can synchronously notify registered listeners on the caller's
//! thread, in subscription order. There is no internal locking: the store is
//! meant to be exclusively owned by one thread during both mutation and
//! solving.

/// Handle identifying one constraint in a [`ConstraintStore`].
///
/// Identifiers are monotonically increasing per store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(u64);

/// Handle identifying one subscribed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer of constraint creation and destruction.
///
/// Callbacks run synchronously on the thread that mutated the store, before
/// the mutating call returns.
pub trait ConstraintListener<C> {
    /// Called after a constraint has been added to the store.
    fn on_constraint_created(&mut self, constraint: &C);

    /// Called after a constraint has been removed from the store.
    fn on_constraint_destroyed(&mut self, constraint: &C);
}

/// Owning collection of constraints with synchronous change notifications.
pub struct ConstraintStore<C> {
    ids: Vec<ConstraintId>,
    items: Vec<C>,
    listeners: Vec<(ListenerId, Box<dyn ConstraintListener<C>>)>,
    next_constraint_id: u64,
    next_listener_id: u64,
}

impl<C> Default for ConstraintStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConstraintStore<C> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            items: Vec::new(),
            listeners: Vec::new(),
            next_constraint_id: 0,
            next_listener_id: 0,
        }
    }

    /// Number of constraints currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store holds no constraints.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The current constraints, in insertion order.
    pub fn items(&self) -> &[C] {
        &self.items
    }

    /// The handles of the current constraints, parallel to [`Self::items`].
    pub fn ids(&self) -> &[ConstraintId] {
        &self.ids
    }

    /// Look up a constraint by handle.
    pub fn get(&self, id: ConstraintId) -> Option<&C> {
        let idx = self.ids.iter().position(|&i| i == id)?;
        Some(&self.items[idx])
    }

    /// Add a constraint to the store and return its handle.
    ///
    /// If `emit` is true, every listener's `on_constraint_created` is called
    /// before this method returns.
    pub fn insert(&mut self, constraint: C, emit: bool) -> ConstraintId {
        let id = ConstraintId(self.next_constraint_id);
        self.next_constraint_id += 1;
        self.ids.push(id);
        self.items.push(constraint);
        log::debug!("constraint {:?} created, store size {}", id, self.items.len());
        if emit {
            if let Some(item) = self.items.last() {
                for (_, listener) in self.listeners.iter_mut() {
                    listener.on_constraint_created(item);
                }
            }
        }
        id
    }

    /// Remove a constraint by handle, returning it.
    ///
    /// If `emit` is true, every listener's `on_constraint_destroyed` is
    /// called with the removed constraint before this method returns.
    /// Returns `None` when the handle is unknown.
    pub fn remove(&mut self, id: ConstraintId, emit: bool) -> Option<C> {
        let idx = self.ids.iter().position(|&i| i == id)?;
        self.ids.remove(idx);
        let constraint = self.items.remove(idx);
        log::debug!("constraint {:?} destroyed, store size {}", id, self.items.len());
        if emit {
            for (_, listener) in self.listeners.iter_mut() {
                listener.on_constraint_destroyed(&constraint);
            }
        }
        Some(constraint)
    }

    /// Register a listener; notifications are delivered in subscription order.
    pub fn subscribe(&mut self, listener: Box<dyn ConstraintListener<C>>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a previously registered listener.
    ///
    /// Returns false when the handle is unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for ConstraintStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintStore")
            .field("ids", &self.ids)
            .field("items", &self.items)
            .field("num_listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::PointConstraint;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingListener {
        label: &'static str,
        events: Rc<RefCell<Vec<String>>>,
    }

    impl ConstraintListener<PointConstraint> for RecordingListener {
        fn on_constraint_created(&mut self, c: &PointConstraint) {
            self.events
                .borrow_mut()
                .push(format!("{}:created:{}", self.label, c.image_x));
        }

        fn on_constraint_destroyed(&mut self, c: &PointConstraint) {
            self.events
                .borrow_mut()
                .push(format!("{}:destroyed:{}", self.label, c.image_x));
        }
    }

    fn constraint(image_x: f64) -> PointConstraint {
        PointConstraint::with_unit_weight(image_x, 0.0, 0.0, 0.0)
    }

    #[test]
    fn insert_returns_monotonic_ids() {
        let mut store = ConstraintStore::new();
        let a = store.insert(constraint(1.0), false);
        let b = store.insert(constraint(2.0), false);
        store.remove(a, false);
        let c = store.insert(constraint(3.0), false);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_returns_the_constraint() {
        let mut store = ConstraintStore::new();
        let id = store.insert(constraint(7.0), false);
        let removed = store.remove(id, false).unwrap();
        assert_eq!(removed.image_x, 7.0);
        assert!(store.is_empty());
        assert!(store.remove(id, false).is_none());
    }

    #[test]
    fn get_by_handle() {
        let mut store = ConstraintStore::new();
        let a = store.insert(constraint(1.0), false);
        let b = store.insert(constraint(2.0), false);
        assert_eq!(store.get(a).unwrap().image_x, 1.0);
        assert_eq!(store.get(b).unwrap().image_x, 2.0);
        store.remove(a, false);
        assert!(store.get(a).is_none());
    }

    #[test]
    fn listeners_notified_in_subscription_order() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut store = ConstraintStore::new();
        store.subscribe(Box::new(RecordingListener {
            label: "first",
            events: events.clone(),
        }));
        store.subscribe(Box::new(RecordingListener {
            label: "second",
            events: events.clone(),
        }));

        let id = store.insert(constraint(4.0), true);
        store.remove(id, true);

        assert_eq!(
            *events.borrow(),
            vec![
                "first:created:4",
                "second:created:4",
                "first:destroyed:4",
                "second:destroyed:4"
            ]
        );
    }

    #[test]
    fn emit_false_suppresses_notifications() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut store = ConstraintStore::new();
        store.subscribe(Box::new(RecordingListener {
            label: "l",
            events: events.clone(),
        }));

        let id = store.insert(constraint(1.0), false);
        store.remove(id, false);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut store = ConstraintStore::new();
        let listener_id = store.subscribe(Box::new(RecordingListener {
            label: "l",
            events: events.clone(),
        }));

        store.insert(constraint(1.0), true);
        assert!(store.unsubscribe(listener_id));
        assert!(!store.unsubscribe(listener_id));
        store.insert(constraint(2.0), true);

        assert_eq!(*events.borrow(), vec!["l:created:1"]);
    }
}
