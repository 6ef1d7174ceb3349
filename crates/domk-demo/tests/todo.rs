//! Todo demo tests

use domk::Host;
use domk_demo::{PAGE, add, item_node, mount, store};

fn titles(host: &Host) -> Vec<String> {
    host.query_all(host.root(), ".list .title")
        .into_iter()
        .map(|n| host.text_content(n))
        .collect()
}

// ============================================================================
// RENDERING
// ============================================================================

#[test]
fn test_initial_render_is_empty() {
    let host = Host::parse(PAGE).unwrap();
    let store = store();
    let _app = mount(&host, &store);
    let empty = host.query_one(host.root(), ".empty").unwrap();
    assert!(!host.has_class(empty, "domk-hide"));
    assert!(titles(&host).is_empty());
    assert_eq!(host.text_content(host.query_one(host.root(), ".remaining").unwrap()), "(0 left)");
}

#[test]
fn test_add_toggle_remove() {
    let host = Host::parse(PAGE).unwrap();
    let store = store();
    let _app = mount(&host, &store);

    add(&host, "one");
    add(&host, "  ");
    add(&host, "two");
    assert_eq!(titles(&host), ["one", "two"]);
    let input = host.query_one(host.root(), "#new").unwrap();
    assert_eq!(host.property(input, "value").to_text(), "");

    let second = item_node(&host, 1).unwrap();
    host.dispatch_event(host.query_one(second, ".done").unwrap(), "change");
    assert!(host.has_class(second, "done"));
    assert_eq!(host.text_content(host.query_one(host.root(), ".remaining").unwrap()), "(1 left)");

    let first = item_node(&host, 0).unwrap();
    host.click(host.query_one(first, ".remove").unwrap());
    assert_eq!(titles(&host), ["two"]);
    // The surviving item keeps its node
    assert_eq!(item_node(&host, 0), Some(second));
}

#[test]
fn test_external_store_changes_render() {
    let host = Host::parse(PAGE).unwrap();
    let store = store();
    let _app = mount(&host, &store);
    store.dispatch(domk_demo::Action::Add("from outside".to_string()));
    assert_eq!(titles(&host), ["from outside"]);
    let empty = host.query_one(host.root(), ".empty").unwrap();
    assert!(host.has_class(empty, "domk-hide"));
}
