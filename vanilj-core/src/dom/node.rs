//! Live Node Tree
//!
//! This is the binding target the rest of the crate renders into: a small,
//! mutable tree of elements, text, comments and fragments with the handful
//! of DOM operations the binder and element builder need.
//!
//! # Ownership
//!
//! Parents own their children; children point back at their parent through
//! a weak reference. A `Node` handle keeps its subtree alive on its own, so
//! a node removed from the tree stays usable and can be inserted again.
//!
//! # Semantics
//!
//! The operations follow the DOM: inserting a node that already has a
//! parent moves it, inserting a fragment moves the fragment's children,
//! and a node is *connected* when its root is a document.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::DomError;

/// Namespace of ordinary HTML elements.
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Namespace of SVG elements.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
    Fragment,
}

/// Callback stored as an element's event-handler property.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// An event delivered through [`Node::dispatch_event`].
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    target: Node,
}

impl Event {
    /// Event name without the `on` prefix, e.g. `click`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element the event was dispatched on.
    pub fn target(&self) -> &Node {
        &self.target
    }
}

struct ElementData {
    tag: String,
    namespace: String,
    attributes: RefCell<IndexMap<String, String>>,
    value: RefCell<String>,
    handlers: RefCell<IndexMap<String, EventHandler>>,
}

enum Data {
    Document,
    Element(ElementData),
    Text(RefCell<String>),
    Comment(RefCell<String>),
    Fragment,
}

struct NodeData {
    id: NodeId,
    data: Data,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
}

/// Handle to a node in the live tree.
///
/// Cloning the handle does not clone the node; equality is identity.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    fn with_data(data: Data) -> Self {
        Self(Rc::new(NodeData {
            id: NodeId::new(),
            data,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub(crate) fn document() -> Self {
        Self::with_data(Data::Document)
    }

    /// Create an element in the HTML namespace.
    pub fn element(tag: &str) -> Self {
        Self::element_ns(HTML_NAMESPACE, tag)
    }

    /// Create an element in the given namespace.
    pub fn element_ns(namespace: &str, tag: &str) -> Self {
        Self::with_data(Data::Element(ElementData {
            tag: tag.to_string(),
            namespace: namespace.to_string(),
            attributes: RefCell::new(IndexMap::new()),
            value: RefCell::new(String::new()),
            handlers: RefCell::new(IndexMap::new()),
        }))
    }

    /// Create a text node.
    pub fn text(data: impl Into<String>) -> Self {
        Self::with_data(Data::Text(RefCell::new(data.into())))
    }

    /// Create a comment node.
    pub fn comment(data: impl Into<String>) -> Self {
        Self::with_data(Data::Comment(RefCell::new(data.into())))
    }

    /// Create an empty document fragment.
    pub fn fragment() -> Self {
        Self::with_data(Data::Fragment)
    }

    /// Get the node's unique ID.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Get the node's kind.
    pub fn node_type(&self) -> NodeType {
        match self.0.data {
            Data::Document => NodeType::Document,
            Data::Element(_) => NodeType::Element,
            Data::Text(_) => NodeType::Text,
            Data::Comment(_) => NodeType::Comment,
            Data::Fragment => NodeType::Fragment,
        }
    }

    /// Tag name, for elements.
    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|el| el.tag.as_str())
    }

    /// Namespace URI, for elements.
    pub fn namespace(&self) -> Option<&str> {
        self.as_element().map(|el| el.namespace.as_str())
    }

    /// Character data, for text and comment nodes.
    pub fn data(&self) -> Option<String> {
        match &self.0.data {
            Data::Text(data) | Data::Comment(data) => Some(data.borrow().clone()),
            _ => None,
        }
    }

    /// Replace the character data of a text or comment node.
    pub fn set_data(&self, value: impl Into<String>) -> Result<(), DomError> {
        match &self.0.data {
            Data::Text(data) | Data::Comment(data) => {
                *data.borrow_mut() = value.into();
                Ok(())
            }
            _ => Err(self.unsupported("set_data")),
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match &self.0.data {
            Data::Text(data) => data.borrow().clone(),
            Data::Comment(_) => String::new(),
            _ => self
                .0
                .children
                .borrow()
                .iter()
                .map(Node::text_content)
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------

    /// The parent node, if attached to one.
    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    /// Snapshot of the child list.
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.children.borrow().last().cloned()
    }

    /// The sibling following this node under the same parent.
    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|child| child == self)?;
        siblings.get(index + 1).cloned()
    }

    /// True if `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// True if the node's root is a document.
    pub fn is_connected(&self) -> bool {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.node_type() == NodeType::Document
    }

    /// Append `child` as the last child.
    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.insert_before(child, None)
    }

    /// Insert `node` before `reference`, or at the end when `reference` is
    /// `None`. A fragment contributes its children and is left empty.
    pub fn insert_before(&self, node: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        if !self.can_have_children()
            || node.node_type() == NodeType::Document
            || node.contains(self)
        {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if reference.parent().as_ref() != Some(self) {
                return Err(DomError::NotFound);
            }
        }

        if node.node_type() == NodeType::Fragment {
            for child in node.children() {
                self.insert_one(&child, reference);
            }
        } else {
            self.insert_one(node, reference);
        }
        Ok(())
    }

    /// Remove `child` from this node's children.
    pub fn remove_child(&self, child: &Node) -> Result<Node, DomError> {
        if child.parent().as_ref() != Some(self) {
            return Err(DomError::NotFound);
        }
        child.detach();
        Ok(child.clone())
    }

    /// Remove this node from its parent, if it has one.
    pub fn remove(&self) {
        self.detach();
    }

    /// Put `replacement` where this node is and remove this node.
    pub fn replace_with(&self, replacement: &Node) -> Result<(), DomError> {
        if replacement == self {
            return Ok(());
        }
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        parent.insert_before(replacement, Some(self))?;
        parent.remove_child(self)?;
        Ok(())
    }

    fn can_have_children(&self) -> bool {
        matches!(
            self.0.data,
            Data::Document | Data::Element(_) | Data::Fragment
        )
    }

    fn insert_one(&self, node: &Node, reference: Option<&Node>) {
        let reference = match reference {
            Some(reference) if reference == node => node.next_sibling(),
            other => other.cloned(),
        };

        node.detach();

        let mut children = self.0.children.borrow_mut();
        let index = reference
            .and_then(|reference| children.iter().position(|child| *child == reference))
            .unwrap_or(children.len());
        children.insert(index, node.clone());
        *node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.0.children.borrow_mut().retain(|child| child != self);
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    // ------------------------------------------------------------------
    // Attributes and properties
    // ------------------------------------------------------------------

    /// Set an attribute on an element.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) -> Result<(), DomError> {
        validate_name(name)?;
        let element = self
            .as_element()
            .ok_or_else(|| self.unsupported("set_attribute"))?;
        element
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.into());
        Ok(())
    }

    /// Get an attribute's value, if present.
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.as_element()?.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.as_element()
            .map(|el| el.attributes.borrow().contains_key(name))
            .unwrap_or(false)
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&self, name: &str) -> bool {
        self.as_element()
            .map(|el| el.attributes.borrow_mut().shift_remove(name).is_some())
            .unwrap_or(false)
    }

    /// Attribute names in insertion order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.as_element()
            .map(|el| el.attributes.borrow().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The element's `value` property.
    pub fn value(&self) -> Option<String> {
        self.as_element().map(|el| el.value.borrow().clone())
    }

    /// Assign the element's `value` property. The attribute is untouched.
    pub fn set_value(&self, value: impl Into<String>) -> Result<(), DomError> {
        let element = self
            .as_element()
            .ok_or_else(|| self.unsupported("set_value"))?;
        *element.value.borrow_mut() = value.into();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Assign (or clear) an event-handler property such as `onclick`.
    pub fn set_event_handler(
        &self,
        property: &str,
        handler: Option<EventHandler>,
    ) -> Result<(), DomError> {
        let element = self
            .as_element()
            .ok_or_else(|| self.unsupported("set_event_handler"))?;
        let property = property.to_ascii_lowercase();
        let mut handlers = element.handlers.borrow_mut();
        match handler {
            Some(handler) => {
                handlers.insert(property, handler);
            }
            None => {
                handlers.shift_remove(&property);
            }
        }
        Ok(())
    }

    pub fn has_event_handler(&self, property: &str) -> bool {
        self.as_element()
            .map(|el| {
                el.handlers
                    .borrow()
                    .contains_key(&property.to_ascii_lowercase())
            })
            .unwrap_or(false)
    }

    /// Invoke the `on<name>` handler, if one is set. Returns whether a
    /// handler ran.
    pub fn dispatch_event(&self, name: &str) -> bool {
        let Some(element) = self.as_element() else {
            return false;
        };
        let property = format!("on{}", name.to_ascii_lowercase());
        let handler = element.handlers.borrow().get(&property).cloned();
        match handler {
            Some(handler) => {
                handler(&Event {
                    name: name.to_string(),
                    target: self.clone(),
                });
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the node and its subtree as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.data {
            Data::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in element.attributes.borrow().iter() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape(value, true));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
            Data::Text(data) => out.push_str(&escape(&data.borrow(), false)),
            Data::Comment(data) => {
                out.push_str("<!--");
                out.push_str(&data.borrow());
                out.push_str("-->");
            }
            Data::Document | Data::Fragment => {
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
            }
        }
    }

    /// A serializable copy of the node and its subtree.
    pub fn snapshot(&self) -> NodeSnapshot {
        let children = || -> Vec<NodeSnapshot> {
            self.0.children.borrow().iter().map(Node::snapshot).collect()
        };
        match &self.0.data {
            Data::Document => NodeSnapshot::Document {
                children: children(),
            },
            Data::Element(element) => NodeSnapshot::Element {
                tag: element.tag.clone(),
                namespace: element.namespace.clone(),
                attributes: element.attributes.borrow().clone(),
                children: children(),
            },
            Data::Text(data) => NodeSnapshot::Text {
                data: data.borrow().clone(),
            },
            Data::Comment(data) => NodeSnapshot::Comment {
                data: data.borrow().clone(),
            },
            Data::Fragment => NodeSnapshot::Fragment {
                children: children(),
            },
        }
    }

    fn as_element(&self) -> Option<&ElementData> {
        match &self.0.data {
            Data::Element(element) => Some(element),
            _ => None,
        }
    }

    fn unsupported(&self, operation: &'static str) -> DomError {
        DomError::InvalidNodeType {
            operation,
            node_type: self.node_type(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.data {
            Data::Element(element) => write!(f, "<{}#{}>", element.tag, self.0.id.0),
            Data::Text(data) => write!(f, "Text#{}({:?})", self.0.id.0, data.borrow()),
            Data::Comment(data) => write!(f, "Comment#{}({:?})", self.0.id.0, data.borrow()),
            Data::Document => write!(f, "Document#{}", self.0.id.0),
            Data::Fragment => write!(f, "Fragment#{}", self.0.id.0),
        }
    }
}

/// Serializable copy of a subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSnapshot {
    Document {
        children: Vec<NodeSnapshot>,
    },
    Element {
        tag: String,
        namespace: String,
        attributes: IndexMap<String, String>,
        children: Vec<NodeSnapshot>,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
    Fragment {
        children: Vec<NodeSnapshot>,
    },
}

/// The root of a live tree. Nodes are connected once they are inserted
/// somewhere under it.
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    body: Node,
}

impl Document {
    /// A document containing an empty `<body>`.
    pub fn new() -> Self {
        let root = Node::document();
        let body = Node::element("body");
        root.0.children.borrow_mut().push(body.clone());
        *body.0.parent.borrow_mut() = Rc::downgrade(&root.0);
        Self { root, body }
    }

    /// The document node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The `<body>` element.
    pub fn body(&self) -> &Node {
        &self.body
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject empty names and names containing whitespace, controls or markup
/// delimiters.
pub(crate) fn validate_name(name: &str) -> Result<(), DomError> {
    let invalid = name.is_empty()
        || name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<')
        });
    if invalid {
        Err(DomError::InvalidCharacter(name.to_string()))
    } else {
        Ok(())
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn append_and_remove_children() {
        let parent = Node::element("ul");
        let a = Node::element("li");
        let b = Node::element("li");

        parent.append_child(&a).unwrap();
        parent.append_child(&b).unwrap();
        assert_eq!(parent.children(), vec![a.clone(), b.clone()]);
        assert_eq!(a.parent(), Some(parent.clone()));
        assert_eq!(a.next_sibling(), Some(b.clone()));

        let removed = parent.remove_child(&a).unwrap();
        assert_eq!(removed, a);
        assert!(a.parent().is_none());
        assert_eq!(parent.children(), vec![b]);

        assert_eq!(parent.remove_child(&a), Err(DomError::NotFound));
    }

    #[test]
    fn insert_before_reference() {
        let parent = Node::element("div");
        let anchor = Node::comment("anchor");
        parent.append_child(&anchor).unwrap();

        let first = Node::text("a");
        let second = Node::text("b");
        parent.insert_before(&first, Some(&anchor)).unwrap();
        parent.insert_before(&second, Some(&anchor)).unwrap();

        assert_eq!(parent.children(), vec![first, second, anchor]);
        assert_eq!(parent.to_html(), "<div>ab<!--anchor--></div>");
    }

    #[test]
    fn insert_moves_existing_node() {
        let a = Node::element("section");
        let b = Node::element("section");
        let child = Node::text("x");

        a.append_child(&child).unwrap();
        b.append_child(&child).unwrap();

        assert_eq!(a.child_count(), 0);
        assert_eq!(child.parent(), Some(b));
    }

    #[test]
    fn fragment_children_are_spread() {
        let frag = Node::fragment();
        frag.append_child(&Node::text("a")).unwrap();
        frag.append_child(&Node::text("b")).unwrap();

        let parent = Node::element("p");
        parent.append_child(&frag).unwrap();

        assert_eq!(frag.child_count(), 0);
        assert_eq!(parent.to_html(), "<p>ab</p>");
    }

    #[test]
    fn hierarchy_errors() {
        let outer = Node::element("div");
        let inner = Node::element("span");
        outer.append_child(&inner).unwrap();

        assert_eq!(inner.append_child(&outer), Err(DomError::HierarchyRequest));
        assert_eq!(outer.append_child(&outer), Err(DomError::HierarchyRequest));
        assert_eq!(
            Node::text("t").append_child(&Node::text("u")),
            Err(DomError::HierarchyRequest)
        );

        let stranger = Node::comment("elsewhere");
        assert_eq!(
            outer.insert_before(&Node::text("z"), Some(&stranger)),
            Err(DomError::NotFound)
        );
    }

    #[test]
    fn connection_follows_document_root() {
        let doc = Document::new();
        let el = Node::element("div");
        assert!(!el.is_connected());

        doc.body().append_child(&el).unwrap();
        assert!(el.is_connected());

        el.remove();
        assert!(!el.is_connected());
    }

    #[test]
    fn attributes_and_value() {
        let input = Node::element("input");
        input.set_attribute("type", "text").unwrap();
        input.set_value("hello").unwrap();

        assert_eq!(input.get_attribute("type").as_deref(), Some("text"));
        assert_eq!(input.value().as_deref(), Some("hello"));
        assert!(!input.has_attribute("value"));
        assert_eq!(input.to_html(), "<input type=\"text\">");

        assert!(input.remove_attribute("type"));
        assert!(!input.remove_attribute("type"));

        assert_eq!(
            input.set_attribute("bad name", "x"),
            Err(DomError::InvalidCharacter("bad name".into()))
        );
        assert!(matches!(
            Node::text("t").set_attribute("id", "x"),
            Err(DomError::InvalidNodeType { .. })
        ));
    }

    #[test]
    fn dispatch_event_calls_handler() {
        let button = Node::element("button");
        let clicks = Rc::new(Cell::new(0));

        let clicks_clone = clicks.clone();
        button
            .set_event_handler(
                "onClick",
                Some(Rc::new(move |event: &Event| {
                    assert_eq!(event.name(), "click");
                    clicks_clone.set(clicks_clone.get() + 1);
                })),
            )
            .unwrap();

        assert!(button.has_event_handler("onclick"));
        assert!(button.dispatch_event("click"));
        assert!(!button.dispatch_event("input"));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn html_escaping() {
        let p = Node::element("p");
        p.set_attribute("title", "a \"quote\" & more").unwrap();
        p.append_child(&Node::text("1 < 2")).unwrap();

        assert_eq!(
            p.to_html(),
            "<p title=\"a &quot;quote&quot; &amp; more\">1 &lt; 2</p>"
        );
    }

    #[test]
    fn replace_with_swaps_position() {
        let parent = Node::element("div");
        let old = Node::text("old");
        let tail = Node::text("tail");
        parent.append_child(&old).unwrap();
        parent.append_child(&tail).unwrap();

        let new = Node::element("b");
        old.replace_with(&new).unwrap();

        assert_eq!(parent.children(), vec![new, tail]);
        assert!(old.parent().is_none());
    }
}
