//! Integration Tests for the Reactive System and DOM Binding
//!
//! These tests verify that signals, computed values, effects, scopes and the
//! DOM layer work together correctly.

use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use vanilj_core::dom::{create_element, mount, resolve, tags, Document, NodeType, Props, View};
use vanilj_core::reactive::{
    batch, computed, use_plugin, with_scope, Effect, Runtime, Signal,
};

fn counter() -> (Rc<Cell<i32>>, Rc<Cell<i32>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

/// A distinct write re-runs a reader exactly once; an equal write re-runs
/// nothing.
#[test]
fn distinct_write_reruns_once_equal_write_never() {
    let signal = Signal::new(1);
    let (runs, runs_clone) = counter();

    let signal_clone = signal.clone();
    let _effect = Effect::new(move |_| {
        signal_clone.get();
        runs_clone.set(runs_clone.get() + 1);
    });
    assert_eq!(runs.get(), 1);

    signal.set(2);
    assert_eq!(runs.get(), 2);

    signal.set(2);
    assert_eq!(runs.get(), 2);
}

/// Test that `peek` never subscribes.
#[test]
fn peek_does_not_subscribe() {
    let signal = Signal::new(0);
    let (runs, runs_clone) = counter();

    let signal_clone = signal.clone();
    let _effect = Effect::new(move |_| {
        signal_clone.peek();
        runs_clone.set(runs_clone.get() + 1);
    });

    signal.set(1);
    signal.set(2);
    assert_eq!(runs.get(), 1);
    assert_eq!(signal.subscriber_count(), 0);
}

/// Diamond: A feeds B and C, D reads both. One write to A re-runs D once.
#[test]
fn diamond_dependency_reruns_once() {
    let a = Signal::new(1);

    let a_b = a.clone();
    let b = computed(move || a_b.get() + 1);
    let a_c = a.clone();
    let c = computed(move || a_c.get() * 10);

    let (runs, runs_clone) = counter();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (b_clone, c_clone, seen_clone) = (b.clone(), c.clone(), seen.clone());
    let _d = Effect::new(move |_| {
        seen_clone.borrow_mut().push((b_clone.get(), c_clone.get()));
        runs_clone.set(runs_clone.get() + 1);
    });

    a.set(2);

    assert_eq!(runs.get(), 2);
    assert_eq!(*seen.borrow(), vec![(2, 10), (3, 20)]);
}

/// Writes inside a batch coalesce into one run that sees the final value.
#[test]
fn batch_coalesces_writes() {
    let a = Signal::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (a_clone, seen_clone) = (a.clone(), seen.clone());
    let _effect = Effect::new(move |_| seen_clone.borrow_mut().push(a_clone.get()));

    batch(|| {
        a.set(1);
        a.set(2);
        assert_eq!(*seen.borrow(), vec![0]);
    });

    assert_eq!(*seen.borrow(), vec![0, 2]);
}

/// A run-1 cleanup runs before run 2's body, and only once.
#[test]
fn cleanup_runs_before_next_run_exactly_once() {
    let mine = Signal::new(0);
    let other = Signal::new(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let (mine_clone, log_clone) = (mine.clone(), log.clone());
    let _effect = Effect::new(move |cleanups| {
        let run = mine_clone.get();
        log_clone.borrow_mut().push(format!("body {run}"));
        let log = log_clone.clone();
        cleanups.add(move || log.borrow_mut().push(format!("cleanup {run}")));
    });

    let other_clone = other.clone();
    let _unrelated = Effect::new(move |_| {
        other_clone.get();
    });

    other.set(1);
    other.set(2);
    mine.set(1);

    assert_eq!(*log.borrow(), vec!["body 0", "cleanup 0", "body 1"]);
}

/// Everything created in a scope is disposed when it exits, also on panic.
#[test]
fn scope_teardown_survives_panic() {
    let signal = Signal::new(0);
    let cleaned = Rc::new(Cell::new(0));

    let (signal_clone, cleaned_clone) = (signal.clone(), cleaned.clone());
    let result = catch_unwind(AssertUnwindSafe(|| {
        with_scope(move || {
            for _ in 0..3 {
                let (signal, cleaned) = (signal_clone.clone(), cleaned_clone.clone());
                Effect::new(move |cleanups| {
                    signal.get();
                    let cleaned = cleaned.clone();
                    cleanups.add(move || cleaned.set(cleaned.get() + 1));
                });
            }
            panic!("render failed");
        })
    }));

    assert!(result.is_err());
    assert_eq!(cleaned.get(), 3);
    assert_eq!(signal.subscriber_count(), 0);
}

/// The derived binder swaps exactly its own nodes and keeps its anchor.
#[test]
fn derived_binding_replaces_its_nodes() {
    let doc = Document::new();
    let items = Signal::new(vec!["a", "b"]);

    let items_clone = items.clone();
    let region = resolve(View::derived(move || items_clone.get()));
    let container = create_element("div", Props::new(), ()).unwrap();
    container.append_child(&region).unwrap();
    mount(doc.body(), &container).unwrap();

    let children = container.children();
    assert_eq!(children.len(), 3);
    assert_eq!(children[2].node_type(), NodeType::Comment);
    let anchor = children[2].clone();
    let (old_a, old_b) = (children[0].clone(), children[1].clone());

    items.set(vec!["c"]);

    let children = container.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].data().as_deref(), Some("c"));
    assert_eq!(children[1], anchor);
    assert!(old_a.parent().is_none());
    assert!(old_b.parent().is_none());
}

/// Reactive attributes skip writes while detached and resume once attached.
#[test]
fn attribute_effect_only_writes_while_attached() {
    let doc = Document::new();
    let title = Signal::new("first".to_string());

    let title_clone = title.clone();
    let props = Props::new().derived("title", move || title_clone.get());
    let heading = tags::h1(props, "hi").unwrap();
    assert!(!heading.has_attribute("title"));

    title.set("second".into());
    assert!(!heading.has_attribute("title"));

    mount(doc.body(), &heading).unwrap();
    title.set("third".into());
    assert_eq!(heading.get_attribute("title").as_deref(), Some("third"));
}

/// Isolated runtimes keep their queues and plugins to themselves.
#[test]
fn isolated_runtime() {
    let outer = Signal::new(0);
    let events = Rc::new(Cell::new(0));

    let events_clone = events.clone();
    Runtime::new().enter(move || {
        use_plugin(move |_| events_clone.set(events_clone.get() + 1));
        let inner = Signal::new(1);
        inner.set(2);
        assert_eq!(Runtime::current().pending_count(), 0);
    });
    let seen = events.get();
    assert_eq!(seen, 2);

    outer.set(1);
    assert_eq!(events.get(), seen);
}

/// A small counter widget, end to end.
#[test]
fn counter_widget() {
    let doc = Document::new();
    let count = Signal::new(0);

    let increment = count.clone();
    let count_view = count.clone();
    let widget = tags::div(
        Props::new().attr("class", "counter"),
        (
            tags::button(
                Props::new().on("click", move |_| increment.update(|n| n + 1)),
                "+",
            )
            .unwrap(),
            tags::span(Props::new(), move || format!("clicked {} times", count_view.get()))
                .unwrap(),
        ),
    )
    .unwrap();
    mount(doc.body(), &widget).unwrap();

    let button = widget.first_child().unwrap();
    button.dispatch_event("click");
    button.dispatch_event("click");

    assert_eq!(count.peek(), 2);
    assert_eq!(
        widget.to_html(),
        "<div class=\"counter\"><button>+</button><span>clicked 2 times<!--wrap--></span></div>"
    );

    let snapshot = serde_json::to_value(widget.snapshot()).unwrap();
    assert_eq!(snapshot["type"], "element");
    assert_eq!(snapshot["attributes"]["class"], "counter");
    assert_eq!(snapshot["children"][1]["children"][1]["type"], "comment");
}
