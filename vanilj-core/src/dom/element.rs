//! Element Builder
//!
//! [`create_element`] builds one element: it picks the namespace from the
//! tag, applies the props in insertion order and appends the children.
//!
//! # Props
//!
//! Each prop is first classified into a [`PropAction`] from its key and its
//! kind, then applied. Reactive props (derived closures and signals) become
//! effects that only write while the element is connected to a document;
//! they still read their dependency on every run so that they stay
//! subscribed while the element is detached.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::binder::{bind, flatten, resolve, IntoView, View};
use super::mount::NodeRef;
use super::node::{validate_name, Event, EventHandler, Node, SVG_NAMESPACE};
use crate::error::DomError;
use crate::reactive::{Effect, ReadSignal, Signal};

/// Tags created in the SVG namespace. Matching is case-sensitive.
const SVG_TAGS: &[&str] = &[
    "svg", "path", "circle", "rect", "line", "g", "text", "polygon", "polyline", "ellipse", "use",
    "defs", "marker", "clipPath", "mask",
];

/// True if `tag` is created in the SVG namespace.
pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(&tag)
}

/// A plain attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    Text(String),
}

impl AttrValue {
    fn into_text(self) -> String {
        match self {
            AttrValue::Bool(value) => value.to_string(),
            AttrValue::Text(text) => text,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

macro_rules! numeric_attr_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::Text(value.to_string())
                }
            }
        )*
    };
}

numeric_attr_value!(i32, i64, u32, u64, usize, f32, f64);

/// A single prop value.
#[derive(Clone)]
pub enum Prop {
    /// Called once with the element.
    Ref(Rc<dyn Fn(&Node)>),
    /// Stored as an event-handler property.
    Handler(EventHandler),
    /// Recomputed attribute.
    Derived(Rc<dyn Fn() -> AttrValue>),
    /// Attribute (or `value` property) following a signal.
    Signal(Rc<dyn Fn() -> String>),
    /// Plain attribute (or `value` property).
    Static(AttrValue),
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Ref(_) => f.write_str("Ref(..)"),
            Prop::Handler(_) => f.write_str("Handler(..)"),
            Prop::Derived(_) => f.write_str("Derived(..)"),
            Prop::Signal(_) => f.write_str("Signal(..)"),
            Prop::Static(value) => f.debug_tuple("Static").field(value).finish(),
        }
    }
}

/// Signals that can back a [`Prop::Signal`].
pub trait SignalProp {
    fn into_prop(self) -> Prop;
}

impl<T: fmt::Display + 'static> SignalProp for Signal<T> {
    fn into_prop(self) -> Prop {
        Prop::Signal(Rc::new(move || self.with(|value| value.to_string())))
    }
}

impl<T: fmt::Display + 'static> SignalProp for ReadSignal<T> {
    fn into_prop(self) -> Prop {
        Prop::Signal(Rc::new(move || self.with(|value| value.to_string())))
    }
}

/// Ordered props for [`create_element`].
///
/// ```rust
/// use vanilj_core::dom::{create_element, Props};
///
/// let link = create_element(
///     "a",
///     Props::new().attr("href", "/docs").attr("hidden", false),
///     "docs",
/// )
/// .unwrap();
/// assert_eq!(link.to_html(), "<a href=\"/docs\" hidden=\"false\">docs</a>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: IndexMap<String, Prop>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw prop. A repeated key keeps its first position.
    pub fn set(mut self, key: impl Into<String>, prop: Prop) -> Self {
        self.entries.insert(key.into(), prop);
        self
    }

    /// Plain attribute, or the `value` property for key `value`.
    pub fn attr(self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, Prop::Static(value.into()))
    }

    /// Event handler. `click` and `onClick` both name the `onclick`
    /// property; a lowercase name is always an event name, so `online`
    /// names `ononline`.
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        let prefixed = event
            .strip_prefix("on")
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_uppercase);
        let key = if prefixed {
            event.to_string()
        } else {
            format!("on{event}")
        };
        self.set(key, Prop::Handler(Rc::new(handler)))
    }

    /// Attribute recomputed from the signals `f` reads. `true` sets it
    /// empty, `false` removes it.
    pub fn derived<V: Into<AttrValue>>(
        self,
        key: impl Into<String>,
        f: impl Fn() -> V + 'static,
    ) -> Self {
        self.set(key, Prop::Derived(Rc::new(move || f().into())))
    }

    /// Attribute, or the `value` property for key `value`, kept equal to
    /// the signal's value.
    pub fn bind(self, key: impl Into<String>, signal: impl SignalProp) -> Self {
        self.set(key, signal.into_prop())
    }

    /// Call `f` with the element once it is created.
    pub fn with_ref(self, f: impl Fn(&Node) + 'static) -> Self {
        self.set("ref", Prop::Ref(Rc::new(f)))
    }

    /// Store the element in `node_ref` once it is created.
    pub fn node_ref(self, node_ref: &NodeRef) -> Self {
        let node_ref = node_ref.clone();
        self.with_ref(move |node| node_ref.set(node.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.entries.iter().map(|(key, prop)| (key.as_str(), prop))
    }
}

impl IntoIterator for Props {
    type Item = (String, Prop);
    type IntoIter = indexmap::map::IntoIter<String, Prop>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// What applying a prop does to the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropAction {
    /// Invoke the ref callback with the element.
    CallRef,
    /// Assign the handler to this (lower-cased) property.
    SetHandler(String),
    /// Effect writing the derived attribute while connected.
    BindAttribute,
    /// Effect writing the `value` property while connected.
    BindValue,
    /// Effect writing the signal's value as an attribute while connected.
    BindSignalAttribute,
    /// Assign the `value` property.
    SetValue,
    /// Set the attribute.
    SetAttribute,
    /// Nothing; the prop's kind does not fit its key.
    Ignore,
}

/// Decide how a prop is applied.
pub fn classify(key: &str, prop: &Prop) -> PropAction {
    match prop {
        Prop::Ref(_) if key == "ref" => PropAction::CallRef,
        Prop::Handler(_) if key.starts_with("on") => {
            PropAction::SetHandler(key.to_ascii_lowercase())
        }
        Prop::Ref(_) | Prop::Handler(_) => PropAction::Ignore,
        Prop::Derived(_) => PropAction::BindAttribute,
        Prop::Signal(_) if key == "value" => PropAction::BindValue,
        Prop::Signal(_) => PropAction::BindSignalAttribute,
        Prop::Static(_) if key == "value" => PropAction::SetValue,
        Prop::Static(_) => PropAction::SetAttribute,
    }
}

/// Create an element, apply `props` in order and append `children`.
///
/// Errors from the node tree (a malformed tag or attribute name, an
/// impossible insertion) are returned. Errors inside reactive props happen
/// later, in effects, and are logged.
pub fn create_element(
    tag: &str,
    props: Props,
    children: impl IntoView,
) -> Result<Node, DomError> {
    validate_name(tag)?;
    let element = if is_svg_tag(tag) {
        Node::element_ns(SVG_NAMESPACE, tag)
    } else {
        Node::element(tag)
    };

    for (key, prop) in props {
        apply_prop(&element, &key, prop)?;
    }

    for child in flatten(children.into_view()) {
        let node = match child {
            View::Signal(current) => bind(current),
            other => resolve(other),
        };
        element.append_child(&node)?;
    }

    Ok(element)
}

fn apply_prop(element: &Node, key: &str, prop: Prop) -> Result<(), DomError> {
    let action = classify(key, &prop);
    match (action, prop) {
        (PropAction::CallRef, Prop::Ref(f)) => f(element),
        (PropAction::SetHandler(property), Prop::Handler(handler)) => {
            element.set_event_handler(&property, Some(handler))?;
        }
        (PropAction::BindAttribute, Prop::Derived(f)) => {
            validate_name(key)?;
            let (element, key) = (element.clone(), key.to_string());
            Effect::new(move |_| {
                let value = f();
                if !element.is_connected() {
                    return;
                }
                let result = match value {
                    AttrValue::Bool(true) => element.set_attribute(&key, ""),
                    AttrValue::Bool(false) => {
                        element.remove_attribute(&key);
                        Ok(())
                    }
                    AttrValue::Text(text) => element.set_attribute(&key, text),
                };
                if let Err(err) = result {
                    tracing::warn!(attribute = %key, error = %err, "failed to update attribute");
                }
            });
        }
        (PropAction::BindValue, Prop::Signal(current)) => {
            let element = element.clone();
            Effect::new(move |_| {
                let value = current();
                if !element.is_connected() {
                    return;
                }
                if let Err(err) = element.set_value(value) {
                    tracing::warn!(error = %err, "failed to update value");
                }
            });
        }
        (PropAction::BindSignalAttribute, Prop::Signal(current)) => {
            validate_name(key)?;
            let (element, key) = (element.clone(), key.to_string());
            Effect::new(move |_| {
                let value = current();
                if !element.is_connected() {
                    return;
                }
                if let Err(err) = element.set_attribute(&key, value) {
                    tracing::warn!(attribute = %key, error = %err, "failed to update attribute");
                }
            });
        }
        (PropAction::SetValue, Prop::Static(value)) => element.set_value(value.into_text())?,
        (PropAction::SetAttribute, Prop::Static(value)) => {
            element.set_attribute(key, value.into_text())?;
        }
        (action, prop) => {
            tracing::warn!(key, ?prop, ?action, "prop ignored");
        }
    }
    Ok(())
}
