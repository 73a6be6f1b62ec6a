//! DOM Binder
//!
//! Turns a [`View`] into live nodes. Static content becomes plain nodes;
//! derived content (a closure) becomes a region of the tree that an effect
//! keeps in sync with the closure's result.
//!
//! # How Derived Regions Work
//!
//! 1. A comment node (the anchor) marks the end of the region. It is placed
//!    in a fragment together with the region's first content, and that
//!    fragment is what [`resolve`] returns.
//!
//! 2. An effect calls the closure, resolves the result and remembers the
//!    nodes it produced.
//!
//! 3. When a signal the closure read changes, the effect removes exactly
//!    the nodes of the previous run and inserts the new ones right before
//!    the anchor, wherever the anchor is by then. Nothing else around the
//!    anchor is touched.
//!
//! 4. Regions created while a run builds its content are nested in that run.
//!    The next run removes their current nodes too, including anything they
//!    inserted after the outer run finished.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::node::{Node, NodeType};
use crate::reactive::{Effect, ReadSignal, Signal};

/// Renderable content.
#[derive(Clone)]
pub enum View {
    /// An existing node, used as is.
    Node(Node),
    /// The current value of a signal.
    Signal(Rc<dyn Fn() -> View>),
    /// Content recomputed whenever the signals it reads change.
    Derived(Rc<dyn Fn() -> View>),
    /// A sequence of views, flattened at any depth.
    List(Vec<View>),
    /// A text node.
    Text(String),
}

impl View {
    /// Derived content from a closure.
    pub fn derived<V: IntoView>(f: impl Fn() -> V + 'static) -> Self {
        View::Derived(Rc::new(move || f().into_view()))
    }

    /// Empty text, the fallback for absent values.
    pub fn empty() -> Self {
        View::Text(String::new())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Node(node) => f.debug_tuple("Node").field(node).finish(),
            View::Signal(_) => f.write_str("Signal(..)"),
            View::Derived(_) => f.write_str("Derived(..)"),
            View::List(items) => f.debug_tuple("List").field(items).finish(),
            View::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

/// Conversion into [`View`].
///
/// Closures returning anything renderable are derived content:
///
/// ```rust
/// use vanilj_core::dom::{resolve, IntoView};
/// use vanilj_core::reactive::Signal;
///
/// let name = Signal::new("world".to_string());
/// let name2 = name.clone();
/// let greeting = resolve((move || format!("hello {}", name2.get())).into_view());
///
/// assert_eq!(greeting.text_content(), "hello world");
/// name.set("there".into());
/// assert_eq!(greeting.text_content(), "hello there");
/// ```
pub trait IntoView {
    fn into_view(self) -> View;
}

impl IntoView for View {
    fn into_view(self) -> View {
        self
    }
}

impl IntoView for Node {
    fn into_view(self) -> View {
        View::Node(self)
    }
}

impl IntoView for &Node {
    fn into_view(self) -> View {
        View::Node(self.clone())
    }
}

impl IntoView for String {
    fn into_view(self) -> View {
        View::Text(self)
    }
}

impl IntoView for &String {
    fn into_view(self) -> View {
        View::Text(self.clone())
    }
}

impl IntoView for &str {
    fn into_view(self) -> View {
        View::Text(self.to_string())
    }
}

impl IntoView for () {
    fn into_view(self) -> View {
        View::empty()
    }
}

macro_rules! display_into_view {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoView for $ty {
                fn into_view(self) -> View {
                    View::Text(self.to_string())
                }
            }
        )*
    };
}

display_into_view!(
    char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl<V: IntoView> IntoView for Option<V> {
    fn into_view(self) -> View {
        match self {
            Some(view) => view.into_view(),
            None => View::empty(),
        }
    }
}

impl<V: IntoView> IntoView for Vec<V> {
    fn into_view(self) -> View {
        View::List(self.into_iter().map(IntoView::into_view).collect())
    }
}

macro_rules! tuple_into_view {
    ($($name:ident),+) => {
        impl<$($name: IntoView),+> IntoView for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_view(self) -> View {
                let ($($name,)+) = self;
                View::List(vec![$($name.into_view()),+])
            }
        }
    };
}

tuple_into_view!(A);
tuple_into_view!(A, B);
tuple_into_view!(A, B, C);
tuple_into_view!(A, B, C, D);
tuple_into_view!(A, B, C, D, E);
tuple_into_view!(A, B, C, D, E, F);
tuple_into_view!(A, B, C, D, E, F, G);
tuple_into_view!(A, B, C, D, E, F, G, H);

impl<V: IntoView + Clone + 'static> IntoView for Signal<V> {
    fn into_view(self) -> View {
        View::Signal(Rc::new(move || self.get().into_view()))
    }
}

impl<V: IntoView + Clone + 'static> IntoView for ReadSignal<V> {
    fn into_view(self) -> View {
        View::Signal(Rc::new(move || self.get().into_view()))
    }
}

impl<F, V> IntoView for F
where
    F: Fn() -> V + 'static,
    V: IntoView,
{
    fn into_view(self) -> View {
        View::derived(self)
    }
}

/// Expand nested lists into one flat sequence, preserving order.
pub fn flatten(view: View) -> Vec<View> {
    let mut out = Vec::new();
    flatten_into(view, &mut out);
    out
}

fn flatten_into(view: View, out: &mut Vec<View>) {
    match view {
        View::List(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        other => out.push(other),
    }
}

/// Produce a node for `view`.
///
/// Derived content is returned as a fragment holding its current nodes and
/// its anchor; inserting the fragment moves them into place.
pub fn resolve(view: View) -> Node {
    match view {
        View::Node(node) => node,
        View::Signal(current) => resolve(current()),
        View::Derived(f) => bind(f),
        View::List(items) => {
            let fragment = Node::fragment();
            for item in flatten(View::List(items)) {
                append(&fragment, &resolve(item));
            }
            fragment
        }
        View::Text(text) => Node::text(text),
    }
}

/// A bound region: the nodes its last run inserted, plus the regions that
/// run created. Nested regions insert content the outer region never sees,
/// so tearing a region down walks them too.
struct Region {
    mounted: RefCell<SmallVec<[Node; 2]>>,
    nested: RefCell<Vec<Rc<Region>>>,
}

impl Region {
    /// Remove everything this region and its nested regions put in the tree.
    fn unmount(&self) {
        let nested = std::mem::take(&mut *self.nested.borrow_mut());
        for region in nested {
            region.unmount();
        }
        let mounted = std::mem::take(&mut *self.mounted.borrow_mut());
        for node in mounted {
            node.remove();
        }
    }
}

thread_local! {
    /// Regions whose closure is running, innermost last.
    static BUILDING: RefCell<Vec<Rc<Region>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the building stack, also when the closure panics.
struct BuildGuard;

impl BuildGuard {
    fn enter(region: &Rc<Region>) -> Self {
        BUILDING.with(|stack| stack.borrow_mut().push(Rc::clone(region)));
        Self
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|stack| stack.borrow_mut().pop());
    }
}

/// Bind `f` to a region of the tree ending at a fresh anchor comment.
pub(crate) fn bind(f: Rc<dyn Fn() -> View>) -> Node {
    let holder = Node::fragment();
    let anchor = Node::comment("wrap");
    append(&holder, &anchor);

    let region = Rc::new(Region {
        mounted: RefCell::new(SmallVec::new()),
        nested: RefCell::new(Vec::new()),
    });
    BUILDING.with(|stack| {
        if let Some(parent) = stack.borrow().last() {
            parent.nested.borrow_mut().push(Rc::clone(&region));
        }
    });

    Effect::new(move |_| {
        let previous = Region {
            mounted: RefCell::new(std::mem::take(&mut *region.mounted.borrow_mut())),
            nested: RefCell::new(std::mem::take(&mut *region.nested.borrow_mut())),
        };

        let nodes = {
            let _building = BuildGuard::enter(&region);
            top_level(resolve(f()))
        };

        previous.unmount();

        match anchor.parent() {
            Some(parent) => {
                for node in &nodes {
                    if let Err(err) = parent.insert_before(node, Some(&anchor)) {
                        tracing::warn!(error = %err, "failed to insert bound content");
                    }
                }
            }
            None => tracing::trace!("anchor is detached; bound content not inserted"),
        }

        *region.mounted.borrow_mut() = nodes;
    });

    holder
}

/// The nodes `node` contributes when inserted: a fragment's children, or
/// the node itself.
fn top_level(node: Node) -> SmallVec<[Node; 2]> {
    if node.node_type() == NodeType::Fragment {
        node.children().into_iter().collect()
    } else {
        SmallVec::from_elem(node, 1)
    }
}

pub(crate) fn append(parent: &Node, child: &Node) {
    if let Err(err) = parent.append_child(child) {
        tracing::warn!(error = %err, "failed to append child");
    }
}
