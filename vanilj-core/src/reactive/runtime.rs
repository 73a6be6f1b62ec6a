//! Reactive Runtime
//!
//! The runtime owns every piece of process-wide reactive state: the stack of
//! running computations, the stack of cleanup scopes, the pending-notification
//! queue used for batching, and the registered plugins.
//!
//! # Lifecycle
//!
//! Each thread gets a runtime the first time anything reactive touches it,
//! and that runtime lives as long as the thread. [`Runtime::enter`] installs
//! a different runtime for the duration of a closure, which is how tests
//! build isolated reactive graphs without sharing state.
//!
//! # Thread Safety
//!
//! None. All handles are `!Send`; the design assumes one logical UI thread.
//! Signals and effects must not be shared between runtimes: the queue an
//! effect lands in is the one installed when the triggering write happens.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::effect::EffectInner;
use super::plugin::PluginEvent;
use super::scheduler::Scheduler;

/// A cleanup action registered in a scope or on an effect run.
pub(crate) type Cleanup = Box<dyn FnOnce()>;

type Plugin = Rc<dyn Fn(&PluginEvent<'_>)>;

thread_local! {
    static CURRENT: RefCell<Rc<Runtime>> = RefCell::new(Runtime::new());
}

/// The reactive runtime.
pub struct Runtime {
    /// Effects currently executing, innermost last.
    observers: RefCell<Vec<Rc<EffectInner>>>,
    /// Cleanup lists of the active scopes, innermost last.
    scopes: RefCell<Vec<Vec<Cleanup>>>,
    /// Pending notifications and the batch flag.
    scheduler: Scheduler,
    /// Lifecycle observers.
    plugins: RefCell<Vec<Plugin>>,
}

impl Runtime {
    /// Create a fresh runtime with no state.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            observers: RefCell::new(Vec::new()),
            scopes: RefCell::new(Vec::new()),
            scheduler: Scheduler::new(),
            plugins: RefCell::new(Vec::new()),
        })
    }

    /// The runtime installed on this thread.
    pub fn current() -> Rc<Self> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Run `f` against the current runtime.
    ///
    /// The runtime is cloned out of the thread-local first, so `f` is free to
    /// re-enter reactive code.
    pub(crate) fn with<R>(f: impl FnOnce(&Runtime) -> R) -> R {
        let runtime = Self::current();
        f(&runtime)
    }

    /// Install this runtime for the duration of `f`, restoring the previous
    /// one afterwards (also when `f` panics).
    pub fn enter<R>(self: &Rc<Self>, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with(|current| current.replace(Rc::clone(self)));
        let _restore = RestoreRuntime(Some(previous));
        f()
    }

    /// Check if a computation is currently running.
    pub fn is_tracking(&self) -> bool {
        !self.observers.borrow().is_empty()
    }

    /// Number of scopes currently open.
    pub fn scope_depth(&self) -> usize {
        self.scopes.borrow().len()
    }

    /// Number of notifications waiting for the current batch to end.
    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Register a lifecycle observer on this runtime.
    pub fn add_plugin(&self, plugin: impl Fn(&PluginEvent<'_>) + 'static) {
        self.plugins.borrow_mut().push(Rc::new(plugin));
    }

    pub(crate) fn observers(&self) -> &RefCell<Vec<Rc<EffectInner>>> {
        &self.observers
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn push_scope(&self) {
        self.scopes.borrow_mut().push(Vec::new());
    }

    pub(crate) fn pop_scope(&self) -> Vec<Cleanup> {
        self.scopes.borrow_mut().pop().unwrap_or_default()
    }

    /// Append a cleanup to the innermost scope. Returns `false` when no
    /// scope is open, in which case the cleanup is dropped unrun.
    pub(crate) fn register_cleanup(&self, cleanup: Cleanup) -> bool {
        match self.scopes.borrow_mut().last_mut() {
            Some(frame) => {
                frame.push(cleanup);
                true
            }
            None => false,
        }
    }

    /// Deliver a lifecycle event to every plugin.
    pub(crate) fn emit(&self, event: &PluginEvent<'_>) {
        if self.plugins.borrow().is_empty() {
            return;
        }
        let plugins = self.plugins.borrow().clone();
        for plugin in plugins {
            plugin(event);
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("observers", &self.observers.borrow().len())
            .field("scopes", &self.scopes.borrow().len())
            .field("pending", &self.scheduler.pending_count())
            .field("batching", &self.scheduler.is_batching())
            .field("plugins", &self.plugins.borrow().len())
            .finish()
    }
}

struct RestoreRuntime(Option<Rc<Runtime>>);

impl Drop for RestoreRuntime {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            CURRENT.with(|current| {
                current.replace(previous);
            });
        }
    }
}
