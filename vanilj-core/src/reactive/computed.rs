//! Computed Implementation
//!
//! A computed value is an effect that writes its result into an internal
//! signal, handed out as a [`ReadSignal`].
//!
//! # Why This Matters
//!
//! The write goes through the signal's change detection, so readers of a
//! computed only re-run when the *result* changes:
//!
//! - A signal changes
//! - The computed recomputes (always, synchronously, ahead of queued effects)
//! - Its readers re-run only if the new result differs from the old one
//!
//! There is no laziness: recomputation happens on every upstream change
//! whether or not anything reads the result.

use std::cell::OnceCell;
use std::rc::Rc;

use super::effect::Effect;
use super::plugin::PluginEvent;
use super::runtime::Runtime;
use super::signal::{ReadSignal, Signal};

/// Create a read-only signal that tracks the result of `f`.
///
/// The backing effect belongs to the innermost open scope, like any effect.
///
/// # Example
///
/// ```rust
/// use vanilj_core::reactive::{computed, Signal};
///
/// let count = Signal::new(2);
/// let count2 = count.clone();
/// let doubled = computed(move || count2.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn computed<T, F>(mut f: F) -> ReadSignal<T>
where
    T: PartialEq + 'static,
    F: FnMut() -> T + 'static,
{
    let slot: Rc<OnceCell<Signal<T>>> = Rc::new(OnceCell::new());

    let output = Rc::clone(&slot);
    Effect::eager(move |_| {
        let value = f();
        match output.get() {
            Some(signal) => signal.set(value),
            None => {
                let _ = output.set(Signal::new(value));
            }
        }
    });

    let signal = slot
        .get()
        .cloned()
        .expect("computed effect runs on creation");

    Runtime::with(|rt| rt.emit(&PluginEvent::ComputedCreate { signal: signal.id() }));
    signal.computed_output()
}
