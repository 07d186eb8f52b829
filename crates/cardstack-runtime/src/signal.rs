#![forbid(unsafe_code)]

//! Single-threaded event broadcast.
//!
//! [`Signal<T>`] fans an event out to every live subscriber in registration
//! order. Subscribers are held weakly: dropping the returned
//! [`Subscription`] guard unsubscribes.
//!
//! # Failure Modes
//!
//! - **Re-entrant emit**: a subscriber may emit on the same signal. The nested
//!   emission is delivered to the subscriber list as it was when the nested
//!   call started; nothing is held borrowed across callbacks.
//! - **Subscriber leak**: guards stored forever keep callbacks alive. Dead
//!   entries are pruned lazily on the next emit.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct SignalInner<T> {
    subscribers: Vec<CallbackWeak<T>>,
    emitted: u64,
}

/// A broadcast point for events of type `T`.
///
/// Cloning a `Signal` creates another handle to the **same** subscriber list.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                subscribers: Vec::new(),
                emitted: 0,
            })),
        }
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Signal")
            .field("subscriber_count", &inner.subscribers.len())
            .field("emitted", &inner.emitted)
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Keep the returned guard alive to stay subscribed.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `event` to every live subscriber.
    pub fn emit(&self, event: &T) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.emitted += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in &callbacks {
            cb(event);
        }
    }

    /// Number of registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Total number of emits so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.inner.borrow().emitted
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it makes the callback unreachable; the weak entry in the signal
/// is pruned on the next emit.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn delivers_in_registration_order() {
        let signal = Signal::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let l2 = Rc::clone(&log);
        let _a = signal.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let _b = signal.subscribe(move |v| l2.borrow_mut().push(("b", *v)));
        signal.emit(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
        assert_eq!(signal.emitted(), 1);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = signal.subscribe(move |()| h.set(h.get() + 1));
        signal.emit(&());
        drop(sub);
        signal.emit(&());
        assert_eq!(hits.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn clones_share_subscribers() {
        let signal = Signal::<i32>::new();
        let other = signal.clone();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = signal.subscribe(move |v| s.set(*v));
        other.emit(&42);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn reentrant_emit_does_not_panic() {
        let signal = Signal::<u8>::new();
        let inner = signal.clone();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = signal.subscribe(move |depth| {
            c.set(c.get() + 1);
            if *depth == 0 {
                inner.emit(&1);
            }
        });
        signal.emit(&0);
        assert_eq!(count.get(), 2);
    }
}
