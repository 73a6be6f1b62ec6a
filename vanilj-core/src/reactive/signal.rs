//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read inside a running effect, the signal records the
//!    effect as a subscriber and the effect records the signal as a source.
//!
//! 2. When a write changes the value, every subscriber is notified, either
//!    right away or at the end of the enclosing batch.
//!
//! 3. Before an effect re-runs it removes itself from all of its sources,
//!    so subscriptions always reflect the latest run.
//!
//! # Equality
//!
//! A write compares the new value with the stored one through `PartialEq`
//! and does nothing when they are equal. For composite values this is
//! structural equality.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::plugin::PluginEvent;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, Subscription};
use super::SubscriberId;
use crate::error::ReactiveError;

/// Unique identifier for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(u64);

impl SignalId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Type-erased view of a signal, used by effects to unsubscribe from the
/// signals they read without knowing their value types.
pub(crate) trait AnySource {
    fn unsubscribe(&self, id: SubscriberId);
}

pub(crate) struct SignalInner<T> {
    id: SignalId,
    value: RefCell<T>,
    subscribers: RefCell<IndexMap<SubscriberId, Subscriber>>,
}

impl<T: 'static> AnySource for SignalInner<T> {
    fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use vanilj_core::reactive::Signal;
///
/// let count = Signal::new(0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// assert_eq!(count.peek(), 5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        let inner = Rc::new(SignalInner {
            id: SignalId::next(),
            value: RefCell::new(value),
            subscribers: RefCell::new(IndexMap::new()),
        });

        Runtime::with(|rt| {
            let initial = inner.value.borrow();
            rt.emit(&PluginEvent::SignalCreate {
                signal: inner.id,
                initial: &*initial as &dyn Any,
            });
        });

        Self { inner }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// Get the current value, subscribing the running effect if any.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value, subscribing the running effect if any.
    ///
    /// The signal must not be written from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Set a new value and notify subscribers if it differs from the
    /// current one.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Update the value using a function of the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T)
    where
        T: PartialEq,
    {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Register a callback invoked after every value change.
    ///
    /// The callback is an ordinary subscriber: it is deferred by `batch`
    /// like any effect.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        let id = SubscriberId::new();
        self.inner
            .subscribers
            .borrow_mut()
            .insert(id, Subscriber::Callback(Rc::new(f)));
        let source: Weak<dyn AnySource> = Rc::downgrade(&self.inner) as Weak<dyn AnySource>;
        Subscription::new(id, source)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// A handle that can read this signal but not write it.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
            computed: false,
        }
    }

    /// Read-only handle for the output of a computed value.
    pub(crate) fn computed_output(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
            computed: true,
        }
    }

    /// Record the running effect, if any, as a subscriber.
    fn track(&self) {
        let Some(observer) = ReactiveContext::current() else {
            return;
        };
        if observer.is_disposed() {
            return;
        }

        let id = observer.id();
        let source: Weak<dyn AnySource> = Rc::downgrade(&self.inner) as Weak<dyn AnySource>;
        observer.add_source(self.inner.id, source);
        self.inner
            .subscribers
            .borrow_mut()
            .entry(id)
            .or_insert(Subscriber::Effect(observer));
    }

    /// Notify all subscribers that the value has changed.
    fn notify(&self) {
        let subscribers: SmallVec<[(SubscriberId, Subscriber); 4]> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(id, subscriber)| (*id, subscriber.clone()))
            .collect();

        tracing::trace!(
            signal = self.inner.id.raw(),
            subscribers = subscribers.len(),
            "signal changed"
        );

        Runtime::with(|rt| {
            {
                let value = self.inner.value.borrow();
                rt.emit(&PluginEvent::SignalUpdate {
                    signal: self.inner.id,
                    value: &*value as &dyn Any,
                });
            }

            let scheduler = rt.scheduler();
            if scheduler.is_batching() {
                for (id, subscriber) in subscribers {
                    scheduler.schedule(id, subscriber);
                }
                return;
            }

            let mut eager: SmallVec<[(SubscriberId, Subscriber); 4]> = SmallVec::new();
            for (id, subscriber) in subscribers {
                if subscriber.is_eager() {
                    eager.push((id, subscriber));
                } else {
                    scheduler.schedule(id, subscriber);
                }
            }
            scheduler.run_eager(eager);
            scheduler.flush();
        });
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Two handles are equal when they point at the same cell.
impl<T: 'static> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T: fmt::Display + 'static> fmt::Display for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal {{{}}}", self.inner.value.borrow())
    }
}

/// Read-only view of a signal.
///
/// Produced by [`Signal::read_only`], [`readonly`] and `computed`. Any attempt
/// to write through it fails with [`ReactiveError::InvalidMutation`].
pub struct ReadSignal<T: 'static> {
    signal: Signal<T>,
    computed: bool,
}

impl<T: 'static> ReadSignal<T> {
    /// Get the underlying signal's ID.
    pub fn id(&self) -> SignalId {
        self.signal.id()
    }

    /// Get the current value, subscribing the running effect if any.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.signal.get()
    }

    /// Borrow the current value, subscribing the running effect if any.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.signal.peek()
    }

    /// Register a callback invoked after every value change.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        self.signal.subscribe(f)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.signal.subscriber_count()
    }

    /// Always fails: read-only signals cannot be written.
    pub fn try_set(&self, _value: T) -> Result<(), ReactiveError> {
        Err(ReactiveError::InvalidMutation)
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            computed: self.computed,
        }
    }
}

impl<T: 'static> PartialEq for ReadSignal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.signal == other.signal
    }
}

impl<T: 'static> From<Signal<T>> for ReadSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        Self {
            signal,
            computed: false,
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

impl<T: fmt::Display + 'static> fmt::Display for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.computed { "Computed" } else { "Readonly" };
        write!(f, "{kind} {{{}}}", self.signal.inner.value.borrow())
    }
}

/// Shorthand for [`Signal::new`].
pub fn signal<T: 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}

/// Shorthand for [`Signal::read_only`].
pub fn readonly<T: 'static>(source: &Signal<T>) -> ReadSignal<T> {
    source.read_only()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_notifies_subscribers() {
        let signal = Signal::new(0);
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let _subscription = signal.subscribe(move || {
            call_count_clone.set(call_count_clone.get() + 1);
        });

        assert_eq!(call_count.get(), 0);

        signal.set(1);
        assert_eq!(call_count.get(), 1);

        signal.set(2);
        assert_eq!(call_count.get(), 2);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let signal = Signal::new(String::from("same"));
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let _subscription = signal.subscribe(move || {
            call_count_clone.set(call_count_clone.get() + 1);
        });

        signal.set(String::from("same"));
        assert_eq!(call_count.get(), 0);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let subscription = signal.subscribe(move || {
            call_count_clone.set(call_count_clone.get() + 1);
        });

        signal.set(1);
        assert_eq!(call_count.get(), 1);

        subscription.unsubscribe();
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(2);
        // Should not have been called again
        assert_eq!(call_count.get(), 1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1, signal2);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }

    #[test]
    fn readonly_rejects_writes() {
        let signal = Signal::new(1);
        let read = readonly(&signal);

        assert_eq!(read.try_set(2), Err(ReactiveError::InvalidMutation));
        assert_eq!(read.get(), 1);

        signal.set(3);
        assert_eq!(read.peek(), 3);
    }

    #[test]
    fn display_formats() {
        let signal = Signal::new(7);
        assert_eq!(signal.to_string(), "Signal {7}");
        assert_eq!(signal.read_only().to_string(), "Readonly {7}");
    }
}
