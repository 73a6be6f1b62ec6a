//! Subscriber types for the reactive system.
//!
//! A subscriber is anything a signal notifies on write: either an effect
//! that read the signal while running, or a plain callback registered with
//! `subscribe`.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::EffectInner;
use super::runtime::Runtime;
use super::signal::AnySource;

/// Unique identifier for a subscriber.
///
/// Signals key their subscriber sets by this ID, so the same effect reading
/// a signal twice during one run is only recorded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something a signal notifies.
#[derive(Clone)]
pub(crate) enum Subscriber {
    /// An effect that read the signal during its last run.
    Effect(Rc<EffectInner>),
    /// A callback registered through `subscribe`.
    Callback(Rc<dyn Fn()>),
}

impl Subscriber {
    /// Deliver the notification.
    pub(crate) fn notify(&self) {
        match self {
            Subscriber::Effect(effect) => effect.run(),
            Subscriber::Callback(callback) => callback(),
        }
    }

    pub(crate) fn is_eager(&self) -> bool {
        matches!(self, Subscriber::Effect(effect) if effect.is_eager())
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Effect(effect) => f.debug_tuple("Effect").field(&effect.id()).finish(),
            Subscriber::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle does NOT unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "a subscription stays active until `unsubscribe` is called"]
pub struct Subscription {
    id: SubscriberId,
    source: Weak<dyn AnySource>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, source: Weak<dyn AnySource>) -> Self {
        Self { id, source }
    }

    /// The ID the callback is registered under.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the callback from the signal, and from the pending queue if a
    /// batch already collected it.
    pub fn unsubscribe(self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.id);
        }
        Runtime::with(|rt| rt.scheduler().cancel(self.id));
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn callback_subscriber_notify_calls_callback() {
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let subscriber = Subscriber::Callback(Rc::new(move || called_clone.set(true)));

        assert!(!called.get());
        subscriber.notify();
        assert!(called.get());
    }
}
