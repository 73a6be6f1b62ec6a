//! Update Scheduler
//!
//! Every notification a signal write produces goes through the scheduler's
//! pending queue. The queue is keyed by subscriber, so a subscriber triggered
//! several times before it gets to run only runs once.
//!
//! # Algorithm
//!
//! 1. A write enqueues a snapshot of the signal's subscribers.
//! 2. If no batch is open and no flush is already draining the queue, the
//!    writer drains it right away, front to back, before `set` returns.
//! 3. Writes made by subscribers while the queue drains are appended to the
//!    same queue instead of running depth-first.
//!
//! Step 3 is what makes diamonds collapse: with `B = f(A)`, `C = g(A)` and an
//! effect `D` reading both, a write to `A` queues the two computeds, each of
//! them queues `D`, and `D` runs once after both have settled.
//!
//! Computeds are the exception to step 3: they recompute the moment a source
//! changes, even mid-drain, so a subscriber that writes a source and then
//! reads a computed derived from it sees the fresh result. Their own readers
//! are still queued.
//!
//! Visiting order is queue order. A subscriber removed before its turn
//! (disposed effect, cancelled subscription) is skipped; one added to a
//! signal during a drain is not visited for the write already in flight.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexMap;

use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};

/// Pending notifications plus the batch depth.
pub(crate) struct Scheduler {
    pending: RefCell<IndexMap<SubscriberId, Subscriber>>,
    batch_depth: Cell<usize>,
    flushing: Cell<bool>,
    held: Cell<usize>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            pending: RefCell::new(IndexMap::new()),
            batch_depth: Cell::new(0),
            flushing: Cell::new(false),
            held: Cell::new(0),
        }
    }

    /// Queue a subscriber. A subscriber already queued keeps its position.
    pub(crate) fn schedule(&self, id: SubscriberId, subscriber: Subscriber) {
        self.pending.borrow_mut().entry(id).or_insert(subscriber);
    }

    /// Drop a queued subscriber, if present.
    pub(crate) fn cancel(&self, id: SubscriberId) {
        self.pending.borrow_mut().shift_remove(&id);
    }

    pub(crate) fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Run eager subscribers now, ahead of the queue. Anything they trigger
    /// is queued and waits for the next flush, so each of them settles
    /// before any queued reader runs.
    pub(crate) fn run_eager<I>(&self, subscribers: I)
    where
        I: IntoIterator<Item = (SubscriberId, Subscriber)>,
    {
        self.held.set(self.held.get() + 1);
        let _hold = HoldGuard(self);
        for (id, subscriber) in subscribers {
            self.cancel(id);
            subscriber.notify();
        }
    }

    /// Drain the queue unless a batch is open, eager subscribers are still
    /// settling, or a drain is already running further up the stack.
    pub(crate) fn flush(&self) {
        if self.is_batching() || self.held.get() > 0 || self.flushing.get() {
            return;
        }

        self.flushing.set(true);
        let _guard = FlushGuard(self);

        let mut delivered = 0usize;
        loop {
            let next = self.pending.borrow_mut().shift_remove_index(0);
            match next {
                Some((_, subscriber)) => {
                    subscriber.notify();
                    delivered += 1;
                }
                None => break,
            }
        }

        if delivered > 0 {
            tracing::trace!(delivered, "flushed pending notifications");
        }
    }

    fn begin_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// Close one batch level. Returns `true` when the outermost batch closed.
    fn end_batch(&self) -> bool {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth == 0
    }
}

struct HoldGuard<'a>(&'a Scheduler);

impl Drop for HoldGuard<'_> {
    fn drop(&mut self) {
        self.0.held.set(self.0.held.get().saturating_sub(1));
    }
}

struct FlushGuard<'a>(&'a Scheduler);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.flushing.set(false);
        if std::thread::panicking() {
            let dropped = std::mem::take(&mut *self.0.pending.borrow_mut()).len();
            if dropped > 0 {
                tracing::warn!(dropped, "subscriber panicked; discarding queued notifications");
            }
        }
    }
}

/// Run `f` with notifications deferred until it returns.
///
/// Every subscriber triggered inside `f` runs exactly once afterwards, in the
/// order it was first triggered, and observes the final values. Nested
/// batches only flush when the outermost one closes.
///
/// If `f` panics, the batch still closes and the notifications collected
/// before the panic are delivered; the panic then resumes. A subscriber that
/// panics while the queue drains discards whatever is still queued behind it.
///
/// # Example
///
/// ```rust
/// use vanilj_core::reactive::{batch, Effect, Signal};
///
/// let a = Signal::new(0);
/// let a2 = a.clone();
/// let _log = Effect::new(move |_| println!("a = {}", a2.get()));
///
/// batch(|| {
///     a.set(1);
///     a.set(2);
/// });
/// // Prints "a = 2" once.
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let runtime = Runtime::current();
    let scheduler = runtime.scheduler();
    scheduler.begin_batch();
    let result = panic::catch_unwind(AssertUnwindSafe(f));

    if scheduler.end_batch() {
        tracing::debug!(
            pending = scheduler.pending_count(),
            panicked = result.is_err(),
            "batch closed"
        );
        scheduler.flush();
    }

    match result {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}
