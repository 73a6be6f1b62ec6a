//! Vanilj Core
//!
//! This crate provides the core runtime for the Vanilj UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, effects, computed values, batches)
//! - Scoped teardown of effects and cleanups
//! - Direct binding of reactive state to a live node tree
//! - An element builder with reactive props and children
//!
//! There is no virtual DOM and no diffing: rendering creates real nodes once
//! and effects patch them in place.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `dom`: The node tree, the binder and the element builder
//! - `error`: Error types shared by both
//! - `util`: Identifier helpers
//!
//! # Example
//!
//! ```rust
//! use vanilj_core::dom::{tags, Document, Props};
//! use vanilj_core::reactive::{computed, Signal};
//!
//! let doc = Document::new();
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let count2 = count.clone();
//! let doubled = computed(move || count2.get() * 2);
//!
//! // Bind it into the tree
//! let label = tags::p(Props::new(), ("doubled: ", doubled)).unwrap();
//! doc.body().append_child(&label).unwrap();
//!
//! // Update the signal; the text node follows
//! count.set(5);
//! assert_eq!(label.text_content(), "doubled: 10");
//! ```

pub mod dom;
pub mod error;
pub mod reactive;
pub mod util;

pub use error::{DomError, Error, ReactiveError, Result};
