//! Plugin hook.
//!
//! Plugins are plain observers of the runtime's lifecycle. They receive
//! every event synchronously, at the point it happens, and may read any
//! signal they are handed. They must not write reactive state from inside
//! the callback.

use std::any::Any;
use std::fmt;

use super::runtime::Runtime;
use super::signal::SignalId;
use super::subscriber::SubscriberId;

/// A lifecycle event delivered to plugins.
pub enum PluginEvent<'a> {
    /// A signal was created.
    SignalCreate {
        signal: SignalId,
        initial: &'a dyn Any,
    },
    /// A signal's value changed. Emitted before subscribers are notified.
    SignalUpdate { signal: SignalId, value: &'a dyn Any },
    /// An effect is about to execute its body.
    EffectRun { effect: SubscriberId },
    /// A computed value finished its first computation.
    ComputedCreate { signal: SignalId },
}

impl PluginEvent<'_> {
    /// Event name, in `subject:action` form.
    pub fn name(&self) -> &'static str {
        match self {
            PluginEvent::SignalCreate { .. } => "signal:create",
            PluginEvent::SignalUpdate { .. } => "signal:update",
            PluginEvent::EffectRun { .. } => "effect:run",
            PluginEvent::ComputedCreate { .. } => "computed:create",
        }
    }

    /// The value carried by `signal:create` / `signal:update`, if it has
    /// type `T`.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        match self {
            PluginEvent::SignalCreate { initial: value, .. }
            | PluginEvent::SignalUpdate { value, .. } => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for PluginEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginEvent::SignalCreate { signal, .. }
            | PluginEvent::SignalUpdate { signal, .. }
            | PluginEvent::ComputedCreate { signal } => f
                .debug_struct(self.name())
                .field("signal", signal)
                .finish(),
            PluginEvent::EffectRun { effect } => f
                .debug_struct(self.name())
                .field("effect", effect)
                .finish(),
        }
    }
}

/// Register a plugin on the current runtime.
pub fn use_plugin(plugin: impl Fn(&PluginEvent<'_>) + 'static) {
    Runtime::with(|rt| rt.add_plugin(plugin));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{computed, Effect, Signal};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn plugins_see_lifecycle_events() {
        let runtime = Runtime::new();
        runtime.enter(|| {
            let events = Rc::new(RefCell::new(Vec::new()));
            let updates = Rc::new(RefCell::new(Vec::new()));

            let (events_clone, updates_clone) = (events.clone(), updates.clone());
            use_plugin(move |event| {
                events_clone.borrow_mut().push(event.name());
                if let Some(value) = event.value::<i32>() {
                    updates_clone.borrow_mut().push(*value);
                }
            });

            let count = Signal::new(1);
            let count_clone = count.clone();
            let _effect = Effect::new(move |_| {
                count_clone.get();
            });
            count.set(2);

            assert_eq!(
                *events.borrow(),
                vec!["signal:create", "effect:run", "signal:update", "effect:run"]
            );
            assert_eq!(*updates.borrow(), vec![1, 2]);

            events.borrow_mut().clear();
            let _doubled = computed(|| 4);
            assert_eq!(
                *events.borrow(),
                vec!["effect:run", "signal:create", "computed:create"]
            );
        });
    }
}
