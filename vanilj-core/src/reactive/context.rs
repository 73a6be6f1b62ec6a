//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a subscriber.
//!
//! # Implementation
//!
//! The stack lives on the thread's current [`Runtime`]. When an effect runs
//! we push it onto the stack; when the run completes (or unwinds) the guard
//! pops it. Only the innermost entry is ever tracked, so an effect created
//! inside another effect's run records its own reads and nothing else.

use std::rc::Rc;

use super::effect::EffectInner;
use super::runtime::Runtime;
use super::SubscriberId;

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub(crate) struct ReactiveContext {
    runtime: Rc<Runtime>,
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given effect.
    ///
    /// While this context is active, any signal that is read registers
    /// the effect as a subscriber.
    pub(crate) fn enter(effect: Rc<EffectInner>) -> Self {
        let runtime = Runtime::current();
        let subscriber_id = effect.id();
        runtime.observers().borrow_mut().push(effect);

        Self {
            runtime,
            subscriber_id,
        }
    }

    /// The innermost running effect, if any.
    pub(crate) fn current() -> Option<Rc<EffectInner>> {
        Runtime::with(|rt| rt.observers().borrow().last().cloned())
    }

    /// Check if there is an active reactive context.
    #[cfg(test)]
    pub(crate) fn is_active() -> bool {
        Runtime::with(|rt| !rt.observers().borrow().is_empty())
    }

    /// Get the current subscriber ID, if any.
    #[cfg(test)]
    pub(crate) fn current_subscriber() -> Option<SubscriberId> {
        Runtime::with(|rt| rt.observers().borrow().last().map(|effect| effect.id()))
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = self.runtime.observers().borrow_mut().pop();

        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                effect.id()
            );
        }
    }
}
