//! DOM Layer
//!
//! Binds reactive state to a live node tree without a virtual DOM: real
//! nodes are created once and then patched in place by effects.
//!
//! - [`node`] is the tree itself.
//! - [`binder`] turns a [`View`] into nodes and keeps derived regions in
//!   sync.
//! - [`element`] and [`tags`] build elements from props and children.
//! - [`mount`] attaches rendered nodes to a tree.

pub mod binder;
pub mod element;
pub mod mount;
pub mod node;
pub mod tags;

pub use binder::{flatten, resolve, IntoView, View};
pub use element::{
    classify, create_element, is_svg_tag, AttrValue, Prop, PropAction, Props, SignalProp,
};
pub use mount::{hydrate, mount, safe_effect, unmount, NodeRef};
pub use node::{
    Document, Event, EventHandler, Node, NodeId, NodeSnapshot, NodeType, HTML_NAMESPACE,
    SVG_NAMESPACE,
};
