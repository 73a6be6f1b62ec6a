//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, effects,
//! computed values, scopes and batching. These primitives form the
//! foundation of Vanilj's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an effect runs, the signal registers that effect as a subscriber.
//! When the signal's value changes, all subscribers are notified.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that re-runs whenever a signal
//! it read changes. Effects are used to synchronize reactive state with the
//! outside world, such as the node tree in [`crate::dom`].
//!
//! ## Computed values
//!
//! A computed value is an effect that stores its result in a signal and
//! hands that signal out read-only.
//!
//! ## Scopes and batches
//!
//! A scope tears down everything created inside it in one go; a batch
//! defers notifications until a group of writes is complete.
//!
//! # Implementation Notes
//!
//! The reactive system keeps a per-runtime stack of running effects to
//! detect dependencies. When a signal is read, we check the top of the stack
//! and, if an effect is running, register the dependency in both directions.
//!
//! Everything here is single-threaded and synchronous: every re-run happens
//! before the write that triggered it returns, or when the enclosing batch
//! closes.

mod computed;
mod context;
mod effect;
mod plugin;
mod runtime;
mod scheduler;
mod scope;
mod signal;
mod subscriber;

pub use computed::computed;
pub use effect::{effect, on_cleanup, Cleanups, Effect};
pub use plugin::{use_plugin, PluginEvent};
pub use runtime::Runtime;
pub use scheduler::batch;
pub use scope::{register_cleanup, with_scope};
pub use signal::{readonly, signal, ReadSignal, Signal, SignalId};
pub use subscriber::{SubscriberId, Subscription};
