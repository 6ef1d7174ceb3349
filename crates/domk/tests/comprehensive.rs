//! Comprehensive tests for domk
//!
//! Components, bindings and child reconciliation driven through the public
//! API against parsed documents.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use domk::{
    AsyncOptions, BindingResult, ChildrenSpec, Component, Context, Event, Host, Key, Listener, NodeId, Options,
    Store, UpdateEvent, Value,
};

fn texts(host: &Host, selector: &str) -> String {
    host.query_all(host.root(), selector)
        .into_iter()
        .map(|node| host.text_content(node))
        .collect::<Vec<_>>()
        .join("|")
}

fn first(host: &Host, selector: &str) -> NodeId {
    host.query_one(host.root(), selector).unwrap()
}

fn children_of(host: &Host, node: NodeId) -> Vec<NodeId> {
    host.with_tree(|tree| tree.child_ids(node))
}

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: u32,
    label: &'static str,
}

fn items(ids: &[u32]) -> Vec<Item> {
    ids.iter()
        .map(|&id| Item {
            id,
            label: ["zero", "one", "two", "three", "four"][id as usize % 5],
        })
        .collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_counter_increments_on_click() {
    let host = Host::parse("<h1></h1>").unwrap();
    let count = Rc::new(Cell::new(0));
    let model = count.clone();
    let app = Component::new(&host, Options::new().model_fn(move || model.get())).one(
        "h1",
        move |n: &i32, cx: &Context| {
            let (cx, count) = (cx.clone(), count.clone());
            BindingResult::new().text(*n).on("click", move |_: &Event| {
                cx.dispatch(|step: i32, _: &Context| count.set(count.get() + step), 1);
            })
        },
    );
    app.update();

    let h1 = first(&host, "h1");
    assert_eq!(host.text_content(h1), "0");
    host.click(h1);
    assert_eq!(host.text_content(h1), "1");
    host.click(h1);
    assert_eq!(host.text_content(h1), "2");
}

#[test]
fn test_one_binds_first_match_only() {
    let host = Host::parse("<h1></h1><h1></h1><h1></h1>").unwrap();
    domk::component::<()>(&host)
        .one("h1", BindingResult::new().text("hello"))
        .update();
    assert_eq!(texts(&host, "h1"), "hello||");
}

#[test]
fn test_all_binds_every_match() {
    let host = Host::parse("<h1></h1><h1></h1><h1></h1>").unwrap();
    domk::component::<()>(&host)
        .all("h1", BindingResult::new().text("hello"))
        .update();
    assert_eq!(texts(&host, "h1"), "hello|hello|hello");
}

#[test]
fn test_async_value_shows_loading_then_result() {
    let host = Host::parse("<p></p>").unwrap();
    let value = domk::async_value(
        &host,
        async {
            smol::Timer::after(Duration::from_millis(10)).await;
            Ok::<_, String>(100)
        },
        AsyncOptions::new().loading("Loading..."),
    );
    domk::component::<()>(&host)
        .one("p", move |_: &(), _: &Context| BindingResult::new().text(value.clone()))
        .update();

    let p = first(&host, "p");
    assert_eq!(host.text_content(p), "Loading...");
    host.block_on(smol::Timer::after(Duration::from_millis(40)));
    assert_eq!(host.text_content(p), "100");
}

// ============================================================================
// CHILD LISTS
// ============================================================================

const LIST: &str = r#"<ul><li class="domk-template"><span></span></li></ul>"#;

fn keyed_list(host: &Host) -> Component<Vec<Item>> {
    domk::component::<Vec<Item>>(host).one(
        "ul",
        domk::keyed_children(
            |list: &Vec<Item>, _: &Context| list.clone(),
            |item: &Item, _| item.id,
            |item: &Item, _: &Context| BindingResult::new().attr("data-id", item.id).text(item.label),
        ),
    )
}

#[test]
fn test_template_is_captured_and_cleared() {
    let host = Host::parse(LIST).unwrap();
    keyed_list(&host).update_with(items(&[1, 2]));
    let ul = first(&host, "ul");
    assert_eq!(
        host.inner_html(ul),
        r#"<li data-id="1">one</li><li data-id="2">two</li>"#
    );
}

#[test]
fn test_keyed_swap_keeps_node_state() {
    let host = Host::parse(LIST).unwrap();
    let list = keyed_list(&host);
    list.update_with(items(&[1, 2, 3]));

    let ul = first(&host, "ul");
    let one = host.child_node(ul, &Key::from("1")).unwrap();
    host.mutate(|tree| tree.set_property(one, "checked", Value::Bool(true)));

    list.update_with(items(&[2, 1, 3]));
    let nodes = children_of(&host, ul);
    assert_eq!(nodes[1], one);
    assert_eq!(host.property(nodes[1], "checked"), Value::Bool(true));
    assert_eq!(host.attribute(nodes[1], "data-id").as_deref(), Some("1"));
    assert_eq!(host.property(nodes[0], "checked"), Value::Bool(false));
    assert_eq!(host.child_keys(ul), vec![Key::from("2"), Key::from("1"), Key::from("3")]);
}

#[test]
fn test_unkeyed_swap_state_follows_position() {
    let host = Host::parse(LIST).unwrap();
    let list = domk::component::<Vec<Item>>(&host).one(
        "ul",
        domk::children(
            |list: &Vec<Item>, _: &Context| list.clone(),
            |item: &Item, _: &Context| BindingResult::new().attr("data-id", item.id),
        ),
    );
    list.update_with(items(&[1, 2, 3]));

    let ul = first(&host, "ul");
    let head = children_of(&host, ul)[0];
    host.mutate(|tree| tree.set_property(head, "checked", Value::Bool(true)));

    list.update_with(items(&[2, 1, 3]));
    let nodes = children_of(&host, ul);
    assert_eq!(nodes[0], head);
    assert_eq!(host.property(nodes[0], "checked"), Value::Bool(true));
    assert_eq!(host.attribute(nodes[0], "data-id").as_deref(), Some("2"));
}

#[test]
fn test_shrinking_list_removes_exactly_the_missing_nodes() {
    let host = Host::parse(LIST).unwrap();
    let list = keyed_list(&host);
    list.update_with(items(&[1, 2, 3]));
    let ul = first(&host, "ul");
    let before = children_of(&host, ul);

    list.update_with(items(&[2]));
    let after = children_of(&host, ul);
    assert_eq!(after, vec![before[1]]);
    assert_eq!(host.child_keys(ul), vec![Key::from("2")]);
    assert!(host.child_node(ul, &Key::from("1")).is_none());
    for removed in [before[0], before[2]] {
        assert!(host.with_tree(|tree| tree.parent(removed)).is_none());
    }
}

#[test]
fn test_reorders_and_appends() {
    let host = Host::parse(LIST).unwrap();
    let list = keyed_list(&host);
    list.update_with(items(&[1, 2, 3]));
    let ul = first(&host, "ul");

    list.update_with(items(&[3, 1, 4, 2]));
    assert_eq!(texts(&host, "li"), "three|one|four|two");
    assert_eq!(children_of(&host, ul).len(), 4);

    list.update_with(Vec::new());
    assert!(children_of(&host, ul).is_empty());
    assert!(host.child_keys(ul).is_empty());
}

#[test]
fn test_children_count_renders_indices() {
    let host = Host::parse("<ol><li></li></ol>").unwrap();
    domk::component::<()>(&host)
        .one("ol", domk::children_count(3, |i: &usize, _: &Context| BindingResult::new().text(*i)))
        .update();
    assert_eq!(texts(&host, "li"), "0|1|2");
}

#[test]
fn test_text_children() {
    let host = Host::parse("<ul><li>template</li></ul>").unwrap();
    let list = domk::component::<Vec<&'static str>>(&host)
        .one("ul", domk::text_children(|words: &Vec<&'static str>, _: &Context| words.clone()));
    list.update_with(vec!["a", "b"]);
    assert_eq!(texts(&host, "li"), "a|b");
}

#[test]
fn test_child_components_render_each_item() {
    let host = Host::parse(LIST).unwrap();
    let row = domk::component::<Item>(&host)
        .one("this", |item: &Item, _: &Context| BindingResult::new().id(format!("item-{}", item.id)))
        .one("span", |item: &Item, _: &Context| BindingResult::new().text(item.label));
    let list = domk::component::<Vec<Item>>(&host).one("ul", move |list: &Vec<Item>, _: &Context| {
        BindingResult::new().children(
            ChildrenSpec::each(list.clone())
                .key(|item: &Item, _| item.id)
                .component(row.clone()),
        )
    });
    list.update_with(items(&[1, 2]));
    assert_eq!(texts(&host, "span"), "one|two");
    assert!(host.query_one(host.root(), "#item-2").is_some());
}

// ============================================================================
// NESTED COMPONENTS
// ============================================================================

#[derive(Debug, Clone)]
struct Tree {
    label: &'static str,
    children: Vec<Tree>,
}

fn leaf(label: &'static str) -> Tree {
    Tree {
        label,
        children: Vec::new(),
    }
}

#[test]
fn test_nested_tree_rendering() {
    let host = Host::parse(r#"<div class="tree"><div class="node"><span></span><div class="children"></div></div></div>"#)
        .unwrap();
    let node = domk::component::<Tree>(&host)
        .one(">span", |tree: &Tree, _: &Context| BindingResult::new().text(tree.label))
        .one(">.children", domk::nested_keyed(|tree: &Tree, _: &Context| tree.children.clone(), |tree: &Tree, _| tree.label));
    let app = domk::component::<Tree>(&host).one(".tree > .node", node);

    app.update_with(Tree {
        label: "root",
        children: vec![
            Tree {
                label: "a",
                children: vec![leaf("a1")],
            },
            leaf("b"),
        ],
    });
    assert_eq!(texts(&host, "span"), "root|a|a1|b");

    app.update_with(Tree {
        label: "root",
        children: vec![Tree {
            label: "a",
            children: vec![leaf("a1"), leaf("a2")],
        }],
    });
    assert_eq!(texts(&host, "span"), "root|a|a1|a2");
    assert_eq!(host.query_all(host.root(), ".node").len(), 4);
}

// ============================================================================
// MODELS AND DISPATCH
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Counter {
    value: i32,
}

enum Action {
    Increment,
    Decrement,
}

fn counter_store() -> Store<Counter> {
    Store::with_reducer(Counter { value: 0 }, |state: &Counter, action: &Action| match action {
        Action::Increment => Counter { value: state.value + 1 },
        Action::Decrement => Counter { value: state.value - 1 },
    })
}

#[test]
fn test_reducer_store_send() {
    let host = Host::parse("<h1></h1><button></button>").unwrap();
    let store = counter_store();
    let app = Component::new(&host, Options::new().store(store.clone()))
        .one("h1", |c: &Counter, _: &Context| BindingResult::new().text(c.value))
        .one("button", |_: &Counter, cx: &Context| {
            let cx = cx.clone();
            BindingResult::new().on("click", move |_: &Event| {
                assert!(cx.send(Action::Increment));
            })
        });
    app.update();
    app.update();
    assert_eq!(store.listener_count(), 1);

    let (h1, button) = (first(&host, "h1"), first(&host, "button"));
    host.click(button);
    host.click(button);
    assert_eq!(host.text_content(h1), "2");

    // External changes re-render through the subscription
    store.dispatch(Action::Decrement);
    assert_eq!(host.text_content(h1), "1");
}

#[test]
fn test_nested_dispatch_renders_once() {
    let host = Host::parse("<button></button>").unwrap();
    let (renders, dispatches) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
    let (r, d) = (renders.clone(), dispatches.clone());
    let app = Component::new(
        &host,
        Options::new()
            .model(())
            .updated(move |_: &UpdateEvent<'_, ()>| r.set(r.get() + 1))
            .dispatched(move |_| d.set(d.get() + 1)),
    )
    .one("button", |_: &(), cx: &Context| {
        let cx = cx.clone();
        BindingResult::new().on("click", move |_: &Event| {
            cx.dispatch(
                |_: (), cx: &Context| {
                    cx.dispatch(|_: (), _: &Context| {}, ());
                    cx.dispatch(|_: (), _: &Context| {}, ());
                },
                (),
            );
        })
    });
    app.update();
    assert_eq!(renders.get(), 1);

    host.click(first(&host, "button"));
    assert_eq!(renders.get(), 2);
    assert_eq!(dispatches.get(), 3);
}

#[test]
fn test_async_dispatch_renders_after_settling() {
    let host = Host::parse("<p></p><button></button>").unwrap();
    let value = Rc::new(Cell::new(0));
    let renders = Rc::new(Cell::new(0));
    let (model, r, store) = (value.clone(), renders.clone(), value.clone());
    let app = Component::new(
        &host,
        Options::new()
            .model_fn(move || model.get())
            .updated(move |_: &UpdateEvent<'_, i32>| r.set(r.get() + 1)),
    )
    .one("p", |n: &i32, _: &Context| BindingResult::new().text(*n))
    .one("button", move |_: &i32, cx: &Context| {
        let (cx, store) = (cx.clone(), store.clone());
        BindingResult::new().on("click", move |_: &Event| {
            let store = store.clone();
            // The returned task is dropped right away
            let _ = cx.dispatch_async(
                move |amount: i32, _: &Context| async move {
                    smol::Timer::after(Duration::from_millis(5)).await;
                    store.set(amount);
                },
                7,
            );
        })
    });
    app.update();
    assert_eq!(renders.get(), 1);

    host.click(first(&host, "button"));
    assert_eq!(renders.get(), 1);
    assert_eq!(host.text_content(first(&host, "p")), "0");

    host.block_on(smol::Timer::after(Duration::from_millis(50)));
    assert_eq!(value.get(), 7);
    assert_eq!(host.text_content(first(&host, "p")), "7");
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_recursive_dispatch_through_future_renders_once() {
    let host = Host::parse("<button></button>").unwrap();
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let app = Component::new(
        &host,
        Options::new()
            .model(())
            .updated(move |_: &UpdateEvent<'_, ()>| r.set(r.get() + 1)),
    )
    .one("button", |_: &(), cx: &Context| {
        let cx = cx.clone();
        BindingResult::new().on("click", move |_: &Event| {
            let _ = cx.dispatch_async(
                |_: (), cx: &Context| {
                    cx.dispatch(|_: (), _: &Context| {}, ());
                    let cx = cx.clone();
                    async move {
                        smol::Timer::after(Duration::from_millis(5)).await;
                        cx.dispatch(|_: (), _: &Context| {}, ());
                        // Outlives the outer future
                        let _ = cx.dispatch_async(
                            |_: (), _: &Context| smol::Timer::after(Duration::from_millis(30)),
                            (),
                        );
                    }
                },
                (),
            );
        })
    });
    app.update();
    assert_eq!(renders.get(), 1);

    host.click(first(&host, "button"));
    assert_eq!(renders.get(), 1);
    host.block_on(smol::Timer::after(Duration::from_millis(10)));
    assert_eq!(renders.get(), 1);
    host.block_on(smol::Timer::after(Duration::from_millis(60)));
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_async_dispatch_task_yields_output() {
    let host = Host::parse("<p></p>").unwrap();
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let slot = Rc::new(RefCell::new(None));
    let cx_slot = slot.clone();
    let app = Component::new(
        &host,
        Options::new()
            .model(())
            .updated(move |_: &UpdateEvent<'_, ()>| r.set(r.get() + 1)),
    )
    .one("p", move |_: &(), cx: &Context| {
        *cx_slot.borrow_mut() = Some(cx.clone());
    });
    app.update();
    let cx: Context = slot.borrow_mut().take().unwrap();

    let task = cx.dispatch_async(
        |amount: i32, _: &Context| async move {
            smol::Timer::after(Duration::from_millis(5)).await;
            amount * 2
        },
        21,
    );
    assert_eq!(host.block_on(task), Some(42));
    assert_eq!(renders.get(), 2);
}

// ============================================================================
// REFERENCES AND PROPS
// ============================================================================

#[test]
fn test_with_ref_registers_handler_for_invoke() {
    let host = Host::parse(r#"<div class="child"></div><h1></h1>"#).unwrap();
    let created = Rc::new(Cell::new(0));
    let c = created.clone();
    let child = Component::new(
        &host,
        Options::new().handler(move |_: &Context, _rerender: Rc<dyn Fn()>, model: &u32| {
            c.set(c.get() + 1);
            let base = *model as f64;
            move |args: &[Value]| Value::from(base + args.len() as f64)
        }),
    )
    .one("this", |n: &u32, _: &Context| BindingResult::new().text(*n));

    let parent = domk::component::<u32>(&host)
        .one(".child", child.with_ref("counter"))
        .one("h1", |_: &u32, cx: &Context| {
            BindingResult::new().text(cx.invoke("counter", &[Value::Null, Value::Null]).unwrap_or_default())
        });
    parent.update_with(5);
    assert_eq!(texts(&host, ".child"), "5");
    assert_eq!(texts(&host, "h1"), "7");

    parent.update_with(6);
    assert_eq!(created.get(), 1);
    assert_eq!(texts(&host, ".child"), "6");
}

#[test]
fn test_with_model_projects_parent_model() {
    #[derive(Clone)]
    struct Page {
        title: &'static str,
    }
    let host = Host::parse(r#"<header><h1></h1></header>"#).unwrap();
    let heading = domk::component::<String>(&host).one("h1", |title: &String, _: &Context| BindingResult::new().text(title));
    domk::component::<Page>(&host)
        .one("header", heading.with_model(|page: &Page, _: &Context| page.title.to_uppercase()))
        .update_with(Page { title: "docs" });
    assert_eq!(texts(&host, "h1"), "DOCS");
}

#[test]
fn test_props_and_scoped_state() {
    let host = Host::parse("<p></p>").unwrap();
    let app = Component::new(&host, Options::new().model(()).prop("greeting", "hi")).one(
        "p",
        |_: &(), cx: &Context| {
            let visits = cx.state(|| 0_u32);
            *visits.borrow_mut() += 1;
            let greeting = cx.prop::<&str>("greeting").map(|g| *g).unwrap_or("?");
            BindingResult::new().text(format!("{} {}", greeting, visits.borrow()))
        },
    );
    app.update();
    app.update();
    assert_eq!(texts(&host, "p"), "hi 2");
}

// ============================================================================
// NODE UPDATES
// ============================================================================

#[test]
fn test_unchanged_update_writes_nothing() {
    let host = Host::parse(r#"<a class="link" style="margin: 0"></a><ul><li></li></ul>"#).unwrap();
    let listener = Listener::new(|_| {});
    let app = domk::component::<Vec<Item>>(&host)
        .one("a", move |list: &Vec<Item>, _: &Context| {
            BindingResult::new()
                .text(list.len())
                .href("/items")
                .class_token("active", !list.is_empty())
                .style_property("color", "red")
                .prop("tabIndex", 2)
                .visible(true)
                .on_listener("click", listener.clone())
        })
        .one(
            "ul",
            domk::keyed_children(
                |list: &Vec<Item>, _: &Context| list.clone(),
                |item: &Item, _| item.id,
                |item: &Item, _: &Context| BindingResult::new().text(item.label).attr("title", item.id),
            ),
        );

    app.update_with(items(&[1, 2, 3]));
    let generation = host.generation();
    app.update_with(items(&[1, 2, 3]));
    assert_eq!(host.generation(), generation);

    app.update_with(items(&[1, 3]));
    assert!(host.generation() > generation);
}

#[test]
fn test_class_and_style_keep_initial_text() {
    let host = Host::parse(r#"<p class="base" style="margin: 0"></p>"#).unwrap();
    let app = domk::component::<&'static str>(&host).one("p", |class: &&'static str, _: &Context| {
        BindingResult::new().class(*class).style("color: red")
    });
    let p = first(&host, "p");

    app.update_with("extra");
    assert_eq!(host.attribute(p, "class").as_deref(), Some("base extra"));
    assert_eq!(host.attribute(p, "style").as_deref(), Some("margin: 0; color: red"));

    app.update_with("other");
    assert_eq!(host.attribute(p, "class").as_deref(), Some("base other"));
}

#[test]
fn test_class_and_style_patches() {
    let host = Host::parse(r#"<p class="base"></p>"#).unwrap();
    let app = domk::component::<bool>(&host).one("p", |on: &bool, _: &Context| {
        BindingResult::new()
            .class_token("selected", *on)
            .style_property("width", if *on { "10px" } else { "" })
    });
    let p = first(&host, "p");

    app.update_with(true);
    assert!(host.has_class(p, "selected"));
    assert!(host.has_class(p, "base"));
    assert_eq!(host.style_property(p, "width").as_deref(), Some("10px"));

    app.update_with(false);
    assert!(!host.has_class(p, "selected"));
    assert_eq!(host.style_property(p, "width"), None);
}

#[test]
fn test_visible_toggles_hidden_class() {
    let host = Host::parse("<p></p>").unwrap();
    let app = domk::component::<bool>(&host).one("p", |shown: &bool, _: &Context| BindingResult::new().visible(*shown));
    let p = first(&host, "p");
    app.update_with(false);
    assert!(host.has_class(p, "domk-hide"));
    app.update_with(true);
    assert!(!host.has_class(p, "domk-hide"));
}

#[test]
fn test_init_runs_once_per_node() {
    let host = Host::parse("<div></div><section></section>").unwrap();
    let app = domk::component::<()>(&host)
        .one("div", BindingResult::new().init("<b>once</b>"))
        .one("div", BindingResult::new().init("<i>twice</i>"))
        .one("section", "<em>template</em>");
    app.update();
    app.update();
    assert_eq!(host.inner_html(first(&host, "div")), "<b>once</b>");
    assert_eq!(host.inner_html(first(&host, "section")), "<em>template</em>");
}

#[test]
fn test_attributes_properties_and_shorthands() {
    let host = Host::parse(r#"<input type="checkbox" name="old">"#).unwrap();
    let app = domk::component::<Option<&'static str>>(&host).one("input", |title: &Option<&'static str>, _: &Context| {
        BindingResult::new()
            .title(*title)
            .checked(title.is_some())
            .disabled(false)
            .set("name", "agree")
    });
    let input = first(&host, "input");

    app.update_with(Some("Agree"));
    assert_eq!(host.attribute(input, "title").as_deref(), Some("Agree"));
    assert_eq!(host.attribute(input, "name").as_deref(), Some("agree"));
    assert_eq!(host.property(input, "checked"), Value::Bool(true));

    app.update_with(None);
    assert_eq!(host.attribute(input, "title"), None);
    assert_eq!(host.property(input, "checked"), Value::Bool(false));
}

#[test]
fn test_additive_listeners_and_update_node() {
    let host = Host::parse("<button></button>").unwrap();
    let clicks = Rc::new(Cell::new(0));
    let passes = Rc::new(Cell::new(0));
    let (c, p) = (clicks.clone(), passes.clone());
    domk::component::<()>(&host)
        .one("button", move |_: &(), cx: &Context| {
            p.set(p.get() + 1);
            let (c, cx) = (c.clone(), cx.clone());
            BindingResult::new().text(p.get()).on("$click", move |_: &Event| {
                c.set(c.get() + 1);
                cx.update_node();
            })
        })
        .update();

    let button = first(&host, "button");
    host.click(button);
    host.click(button);
    // The previous additive listener is swapped out on every pass
    assert_eq!(clicks.get(), 2);
    assert_eq!(passes.get(), 3);
    assert_eq!(host.text_content(button), "3");
}
