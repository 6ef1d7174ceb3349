//! Comprehensive tests for domk-dom
//!
//! Tree mutation, listener bookkeeping and serialization through the
//! public API only.

use domk_dom::{Document, DomTree, Event, Listener, NodeId, NodeOperations, Value};
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// STRUCTURE
// ============================================================================

#[test]
fn test_reorder_children_with_anchor() {
    let mut tree = DomTree::new();
    let ul = tree.create_element("ul");
    tree.append_child(tree.root(), ul).unwrap();
    let items: Vec<NodeId> = (0..4)
        .map(|_| {
            let li = tree.create_element("li");
            tree.append_child(ul, li).unwrap();
            li
        })
        .collect();

    // Reverse via repeated insert-before-anchor, the way a list reconciler does
    let mut anchor = None;
    for &item in &items {
        tree.insert_before(ul, item, anchor).unwrap();
        anchor = Some(item);
    }
    let reversed: Vec<NodeId> = items.iter().rev().copied().collect();
    assert_eq!(tree.child_ids(ul), reversed);
    assert_eq!(tree.first_child(ul), Some(items[3]));
    assert_eq!(tree.last_child(ul), Some(items[0]));
}

#[test]
fn test_moving_between_parents() {
    let mut tree = DomTree::new();
    let a = tree.create_element("div");
    let b = tree.create_element("div");
    let child = tree.create_element("span");
    tree.append_child(tree.root(), a).unwrap();
    tree.append_child(tree.root(), b).unwrap();
    tree.append_child(a, child).unwrap();
    tree.append_child(b, child).unwrap();
    assert!(tree.child_ids(a).is_empty());
    assert_eq!(tree.parent(child), Some(b));
}

#[test]
fn test_ids_are_never_reused() {
    let mut tree = DomTree::new();
    let first = tree.create_element("div");
    tree.append_child(tree.root(), first).unwrap();
    tree.remove_child(tree.root(), first).unwrap();
    let second = tree.create_element("div");
    assert_ne!(first, second);
    assert!(!tree.is_connected(first));
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_event_path_bubbles_to_root() {
    let mut doc = Document::new("about:blank");
    let body = doc.body().unwrap();
    let tree = doc.tree_mut();
    let button = tree.create_element("button");
    tree.append_child(body, button).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    tree.add_listener(body, "click", Listener::new(move |e: &Event| {
        log.borrow_mut().push(e.current_target());
    }))
    .unwrap();

    let event = Event::new("click", button);
    for node in tree.event_path(&event) {
        event.set_current_target(node);
        for listener in tree.listeners(node, "click") {
            listener.call(&event);
        }
    }
    assert_eq!(*seen.borrow(), vec![body]);
}

#[test]
fn test_property_defaults_from_attributes() {
    let mut tree = DomTree::new();
    let input = tree.create_element("input");
    tree.set_attribute(input, "checked", "").unwrap();
    tree.set_attribute(input, "value", "x").unwrap();
    assert_eq!(tree.property(input, "checked"), Value::Bool(true));
    assert_eq!(tree.property(input, "value"), Value::from("x"));
    tree.set_property(input, "checked", Value::Bool(false)).unwrap();
    assert_eq!(tree.property(input, "checked"), Value::Bool(false));
    assert_eq!(tree.property(input, "unknown"), Value::Null);
}

// ============================================================================
// SERIALIZATION
// ============================================================================

#[test]
fn test_document_outer_html() {
    let mut doc = Document::new("about:blank");
    let body = doc.body().unwrap();
    let tree = doc.tree_mut();
    let p = tree.create_element("p");
    tree.append_child(body, p).unwrap();
    tree.set_text_content(p, "hi").unwrap();
    assert_eq!(
        doc.tree().outer_html(NodeId::ROOT),
        "<html><head></head><body><p>hi</p></body></html>"
    );
}
