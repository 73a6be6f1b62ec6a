//! Scoped effect lifetime.
//!
//! A scope collects every effect and cleanup registered while a block of
//! code runs, and tears all of them down together when the block exits.
//! This is how a whole UI subtree's effects are released with one call.

use std::rc::Rc;

use super::runtime::Runtime;

/// Run `f` inside a fresh scope.
///
/// When `f` returns or panics, the scope is popped and every cleanup
/// collected in it runs, in registration order.
///
/// # Example
///
/// ```rust
/// use vanilj_core::reactive::{with_scope, Effect, Signal};
///
/// let count = Signal::new(0);
/// let count2 = count.clone();
///
/// let effect = with_scope(move || Effect::new(move |_| { count2.get(); }));
///
/// assert!(effect.is_disposed());
/// assert_eq!(count.subscriber_count(), 0);
/// ```
pub fn with_scope<R>(f: impl FnOnce() -> R) -> R {
    let runtime = Runtime::current();
    runtime.push_scope();
    let _guard = ScopeGuard { runtime };
    f()
}

/// Append `f` to the innermost open scope.
///
/// Outside of any scope this does nothing and `f` is dropped unrun.
pub fn register_cleanup(f: impl FnOnce() + 'static) {
    let registered = Runtime::with(|rt| rt.register_cleanup(Box::new(f)));
    if !registered {
        tracing::trace!("register_cleanup called outside of a scope; ignored");
    }
}

struct ScopeGuard {
    runtime: Rc<Runtime>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let cleanups = self.runtime.pop_scope();
        if !cleanups.is_empty() {
            tracing::debug!(cleanups = cleanups.len(), "tearing down scope");
        }
        for cleanup in cleanups {
            cleanup();
        }
    }
}
