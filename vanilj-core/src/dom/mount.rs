//! Mounting, hydration and node references.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::binder::{resolve, IntoView};
use super::node::Node;
use crate::error::DomError;
use crate::reactive::{Cleanups, Effect};

/// Append `node` to `target`.
pub fn mount(target: &Node, node: &Node) -> Result<(), DomError> {
    target.append_child(node)
}

/// Detach `node` from its parent. Detached nodes are left alone.
pub fn unmount(node: &Node) {
    if node.parent().is_some() {
        node.remove();
    }
}

/// Render `view_fn` and put the result in place of `existing`.
///
/// When the rendered node is `existing` itself, nothing is replaced.
pub fn hydrate<V: IntoView>(
    existing: Option<&Node>,
    view_fn: impl FnOnce() -> V,
) -> Result<Node, DomError> {
    let rendered = resolve(view_fn().into_view());
    if let Some(existing) = existing {
        if *existing != rendered {
            existing.replace_with(&rendered)?;
        }
    }
    Ok(rendered)
}

/// A mutable slot holding a node, filled by the `ref` prop.
#[derive(Clone, Default)]
pub struct NodeRef {
    current: Rc<RefCell<Option<Node>>>,
}

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node currently held, if any.
    pub fn current(&self) -> Option<Node> {
        self.current.borrow().clone()
    }

    pub fn set(&self, node: Node) {
        *self.current.borrow_mut() = Some(node);
    }

    pub fn clear(&self) {
        self.current.borrow_mut().take();
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&*self.current.borrow()).finish()
    }
}

/// An effect whose body only runs while `node_ref` holds a connected node.
///
/// A skipped run reads nothing, so the effect then waits for a new trigger
/// from whatever the last executed run read.
pub fn safe_effect<F>(node_ref: &NodeRef, mut f: F) -> Effect
where
    F: FnMut(&Cleanups<'_>) + 'static,
{
    let node_ref = node_ref.clone();
    Effect::new(move |cleanups| {
        let connected = node_ref
            .current()
            .map(|node| node.is_connected())
            .unwrap_or(false);
        if !connected {
            tracing::trace!("node not connected; effect body skipped");
            return;
        }
        f(cleanups);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{create_element, Document, Props};
    use crate::reactive::Signal;
    use std::cell::Cell;

    #[test]
    fn mount_and_unmount() {
        let doc = Document::new();
        let el = Node::element("main");

        mount(doc.body(), &el).unwrap();
        assert!(el.is_connected());

        unmount(&el);
        assert!(!el.is_connected());
        unmount(&el);
    }

    #[test]
    fn hydrate_replaces_existing_node() {
        let doc = Document::new();
        let placeholder = Node::element("div");
        mount(doc.body(), &placeholder).unwrap();

        let rendered = hydrate(Some(&placeholder), || {
            create_element("section", Props::new(), "ready").unwrap()
        })
        .unwrap();

        assert!(placeholder.parent().is_none());
        assert_eq!(rendered.parent().as_ref(), Some(doc.body()));
        assert_eq!(doc.body().to_html(), "<body><section>ready</section></body>");
    }

    #[test]
    fn hydrate_keeps_identical_node() {
        let doc = Document::new();
        let existing = Node::element("div");
        mount(doc.body(), &existing).unwrap();

        let same = existing.clone();
        let rendered = hydrate(Some(&existing), move || same).unwrap();
        assert_eq!(rendered, existing);
        assert_eq!(doc.body().child_count(), 1);

        let fresh = hydrate(None, || "text").unwrap();
        assert!(fresh.parent().is_none());
    }

    #[test]
    fn node_ref_is_filled_by_prop() {
        let node_ref = NodeRef::new();
        assert!(node_ref.current().is_none());

        let el = create_element("canvas", Props::new().node_ref(&node_ref), ()).unwrap();
        assert_eq!(node_ref.current(), Some(el));

        node_ref.clear();
        assert!(node_ref.current().is_none());
    }

    #[test]
    fn safe_effect_skips_detached_nodes() {
        let doc = Document::new();
        let node_ref = NodeRef::new();
        let count = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (count_clone, runs_clone) = (count.clone(), runs.clone());
        let effect = safe_effect(&node_ref, move |_| {
            count_clone.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 0);
        assert_eq!(effect.run_count(), 1);
        effect.dispose();

        let el = Node::element("div");
        mount(doc.body(), &el).unwrap();
        node_ref.set(el);

        let (count_clone, runs_clone) = (count.clone(), runs.clone());
        let _effect = safe_effect(&node_ref, move |_| {
            count_clone.get();
            runs_clone.set(runs_clone.get() + 1);
        });
        count.set(1);
        assert_eq!(runs.get(), 2);
    }
}
