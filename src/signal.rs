//! Synchronous observer registries.
//!
//! Provides the `Signal<T>` type, a typed callback registry delivering
//! notifications synchronously in the same call stack. This preserves the
//! engine's ordering guarantees: every dirtied/updated/changed
//! notification fires at the exact point of state change, never queued.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by [`Signal::connect`], used to disconnect later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Slot<T> {
    id: Subscription,
    callback: Rc<dyn Fn(&T)>,
}

/// A synchronous, single-threaded callback registry.
///
/// Emission iterates over a stable snapshot of the connected callbacks,
/// so a callback may connect or disconnect subscribers (including itself)
/// without invalidating the iteration in progress.
///
/// # Examples
///
/// ```rust
/// use stathub::signal::Signal;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let signal: Signal<i32> = Signal::new();
/// let seen = Rc::new(Cell::new(0));
///
/// let seen2 = seen.clone();
/// let sub = signal.connect(move |n| seen2.set(*n));
///
/// signal.emit(&7);
/// assert_eq!(seen.get(), 7);
///
/// signal.disconnect(sub);
/// signal.emit(&8);
/// assert_eq!(seen.get(), 7);
/// ```
pub struct Signal<T> {
    slots: RefCell<Vec<Slot<T>>>,
    next_id: Cell<u64>,
}

impl<T> Signal<T> {
    /// Create a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register a callback; returns a handle for later disconnection.
    pub fn connect(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = Subscription(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.slots.borrow_mut().push(Slot {
            id,
            callback: Rc::new(callback),
        });
        id
    }

    /// Remove a previously connected callback.
    ///
    /// Returns `false` if the subscription was already disconnected.
    pub fn disconnect(&self, subscription: Subscription) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|slot| slot.id != subscription);
        slots.len() < before
    }

    /// Invoke every connected callback with `arg`, in connection order.
    pub fn emit(&self, arg: &T) {
        // snapshot so callbacks may mutate the subscriber list
        let callbacks: Vec<Rc<dyn Fn(&T)>> = self
            .slots
            .borrow()
            .iter()
            .map(|slot| slot.callback.clone())
            .collect();

        for callback in callbacks {
            callback(arg);
        }
    }

    /// Number of connected callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.slots.borrow().len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_connection_order() {
        let signal: Signal<()> = Signal::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            signal.connect(move |_| order.borrow_mut().push(n));
        }

        signal.emit(&());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_disconnect() {
        let signal: Signal<i32> = Signal::new();
        let hits = Rc::new(Cell::new(0));

        let hits2 = hits.clone();
        let sub = signal.connect(move |_| hits2.set(hits2.get() + 1));

        signal.emit(&1);
        assert!(signal.disconnect(sub));
        assert!(!signal.disconnect(sub));
        signal.emit(&2);

        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_callback_may_disconnect_during_emit() {
        let signal: Rc<Signal<()>> = Rc::new(Signal::new());
        let hits = Rc::new(Cell::new(0));

        let sub_cell: Rc<Cell<Option<Subscription>>> = Rc::new(Cell::new(None));
        let signal2 = signal.clone();
        let sub_cell2 = sub_cell.clone();
        let hits2 = hits.clone();
        let sub = signal.connect(move |_| {
            hits2.set(hits2.get() + 1);
            if let Some(sub) = sub_cell2.take() {
                signal2.disconnect(sub);
            }
        });
        sub_cell.set(Some(sub));

        signal.emit(&());
        signal.emit(&());
        // second emission reaches nobody
        assert_eq!(hits.get(), 1);
    }
}
