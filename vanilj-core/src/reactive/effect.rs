//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued and re-run (right
//!    away, or when the enclosing batch closes).
//!
//! 3. Before re-running, the effect invokes the cleanups registered by its
//!    previous run and unsubscribes from every signal that run read.
//!
//! # Cleanup
//!
//! The body receives a [`Cleanups`] handle. Anything added through it runs
//! before the next run and when the effect is disposed. Effects created while
//! the body runs are owned by that run and are disposed the same way.
//!
//! # Reentrancy
//!
//! An effect that triggers itself (writes a signal it has already read in
//! the current run) is not re-entered; it runs again once the current run
//! returns. Two effects that keep writing each other's inputs never settle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::plugin::PluginEvent;
use super::runtime::{Cleanup, Runtime};
use super::signal::{AnySource, SignalId};
use super::subscriber::SubscriberId;

type EffectFn = Box<dyn FnMut(&Cleanups<'_>)>;

/// Registration handle passed to an effect body.
pub struct Cleanups<'a> {
    effect: &'a EffectInner,
}

impl Cleanups<'_> {
    /// Register `f` to run before the next run of this effect, or when it
    /// is disposed.
    pub fn add(&self, f: impl FnOnce() + 'static) {
        self.effect.push_cleanup(Box::new(f));
    }
}

pub(crate) struct EffectInner {
    id: SubscriberId,
    body: RefCell<EffectFn>,
    cleanups: RefCell<SmallVec<[Cleanup; 2]>>,
    sources: RefCell<IndexMap<SignalId, Weak<dyn AnySource>>>,
    running: Cell<bool>,
    rerun: Cell<bool>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
    eager: bool,
}

impl EffectInner {
    fn new(body: EffectFn, eager: bool) -> Self {
        Self {
            id: SubscriberId::new(),
            body: RefCell::new(body),
            cleanups: RefCell::new(SmallVec::new()),
            sources: RefCell::new(IndexMap::new()),
            running: Cell::new(false),
            rerun: Cell::new(false),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
            eager,
        }
    }

    /// An effect that has never run, for exercising the context stack.
    #[cfg(test)]
    pub(crate) fn detached() -> Rc<Self> {
        Rc::new(Self::new(Box::new(|_| {}), false))
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Eager effects run as soon as a source changes, even mid-drain.
    pub(crate) fn is_eager(&self) -> bool {
        self.eager
    }

    /// Remember a signal read during the current run.
    pub(crate) fn add_source(&self, id: SignalId, source: Weak<dyn AnySource>) {
        self.sources.borrow_mut().entry(id).or_insert(source);
    }

    pub(crate) fn push_cleanup(&self, cleanup: Cleanup) {
        if self.disposed.get() {
            cleanup();
            return;
        }
        self.cleanups.borrow_mut().push(cleanup);
    }

    /// Execute the effect body.
    pub(crate) fn run(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        if self.running.get() {
            self.rerun.set(true);
            return;
        }

        loop {
            self.clear();
            {
                let _guard = RunGuard::enter(self);
                let run = self.run_count.get() + 1;
                self.run_count.set(run);
                tracing::trace!(effect = ?self.id, run, "running effect");
                Runtime::with(|rt| rt.emit(&PluginEvent::EffectRun { effect: self.id }));

                let cleanups = Cleanups { effect: &**self };
                let mut body = self.body.borrow_mut();
                (*body)(&cleanups);
            }

            if !self.rerun.replace(false) || self.disposed.get() {
                break;
            }
        }
    }

    /// Run the previous run's cleanups and drop its subscriptions.
    fn clear(&self) {
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }

        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for (_, source) in sources {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(self.id);
            }
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        tracing::trace!(effect = ?self.id, "disposing effect");

        Runtime::with(|rt| rt.scheduler().cancel(self.id));
        self.clear();

        // Release captured state unless the body is on the stack right now.
        if !self.running.get() {
            *self.body.borrow_mut() = Box::new(|_| {});
        }
    }
}

/// Keeps the bookkeeping of one run balanced, also when the body panics.
struct RunGuard<'a> {
    effect: &'a Rc<EffectInner>,
    runtime: Rc<Runtime>,
    _context: ReactiveContext,
}

impl<'a> RunGuard<'a> {
    fn enter(effect: &'a Rc<EffectInner>) -> Self {
        let runtime = Runtime::current();
        effect.running.set(true);
        runtime.push_scope();
        let context = ReactiveContext::enter(Rc::clone(effect));

        Self {
            effect,
            runtime,
            _context: context,
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        // Effects and cleanups registered in the body's dynamic extent
        // belong to this run.
        let owned = self.runtime.pop_scope();
        if self.effect.disposed.get() {
            for cleanup in owned {
                cleanup();
            }
        } else {
            self.effect.cleanups.borrow_mut().extend(owned);
        }
        if std::thread::panicking() {
            self.effect.rerun.set(false);
        }
        self.effect.running.set(false);
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// The handle is the effect's disposer. Dropping it does not stop the
/// effect; call [`Effect::dispose`] or let the enclosing scope do it.
///
/// # Example
///
/// ```rust
/// use vanilj_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
///
/// let count2 = count.clone();
/// let effect = Effect::new(move |cleanups| {
///     let value = count2.get();
///     cleanups.add(move || println!("leaving {value}"));
/// });
///
/// count.set(5); // Prints: "leaving 0"
/// effect.dispose(); // Prints: "leaving 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies, then
    /// the effect's disposal is registered with the innermost open scope.
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(&Cleanups<'_>) + 'static,
    {
        Self::create(f, false)
    }

    /// An effect that re-runs synchronously when a source is written, ahead
    /// of anything already queued. Backs `computed`.
    pub(crate) fn eager<F>(f: F) -> Self
    where
        F: FnMut(&Cleanups<'_>) + 'static,
    {
        Self::create(f, true)
    }

    fn create<F>(f: F, eager: bool) -> Self
    where
        F: FnMut(&Cleanups<'_>) + 'static,
    {
        let inner = Rc::new(EffectInner::new(Box::new(f), eager));
        inner.run();

        let effect = Self { inner };
        let handle = effect.clone();
        super::scope::register_cleanup(move || handle.dispose());
        effect
    }

    /// Get the effect's subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Stop the effect: run its cleanups, unsubscribe it from its signals
    /// and drop any queued notification. Calling it again is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of signals the last run read.
    pub fn dependency_count(&self) -> usize {
        self.inner.sources.borrow().len()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Shorthand for [`Effect::new`].
pub fn effect<F>(f: F) -> Effect
where
    F: FnMut(&Cleanups<'_>) + 'static,
{
    Effect::new(f)
}

/// Register a cleanup on the innermost running effect.
///
/// Outside of any effect this does nothing.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    match ReactiveContext::current() {
        Some(effect) => effect.push_cleanup(Box::new(f)),
        None => tracing::trace!("on_cleanup called outside of an effect; ignored"),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
