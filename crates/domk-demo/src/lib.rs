//! Todo list demo
//!
//! Binds a static page to a reducer store: the list is reconciled by id,
//! the counter and empty-state message follow the store.

use domk::{BindingResult, ChildrenSpec, Component, Context, Event, Host, NodeId, Options, Store, Value};

/// Page the demo binds to
pub const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Todos</title></head>
<body>
<main id="todos">
  <h1>Todos <span class="remaining"></span></h1>
  <input id="new" type="text">
  <button id="add">Add</button>
  <ul class="list">
    <li class="domk-template"><input class="done" type="checkbox"><span class="title"></span><button class="remove">x</button></li>
  </ul>
  <p class="empty">Nothing to do</p>
</main>
</body>
</html>"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub id: u32,
    pub title: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Todos {
    pub items: Vec<Todo>,
    next_id: u32,
}

impl Todos {
    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|t| !t.done).count()
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Add(String),
    Toggle(u32),
    Remove(u32),
}

fn reduce(state: &Todos, action: &Action) -> Todos {
    let mut next = state.clone();
    match action {
        Action::Add(title) => {
            let title = title.trim();
            if title.is_empty() {
                return next;
            }
            next.next_id += 1;
            next.items.push(Todo {
                id: next.next_id,
                title: title.to_string(),
                done: false,
            });
        }
        Action::Toggle(id) => {
            if let Some(todo) = next.items.iter_mut().find(|t| t.id == *id) {
                todo.done = !todo.done;
            }
        }
        Action::Remove(id) => next.items.retain(|t| t.id != *id),
    }
    next
}

/// Store driving the page
pub fn store() -> Store<Todos> {
    Store::with_reducer(Todos::default(), reduce)
}

fn item(host: &Host) -> Component<Todo> {
    domk::component(host)
        .one(domk::THIS, |todo: &Todo, _: &Context| BindingResult::new().class_token("done", todo.done))
        .one(".title", |todo: &Todo, _: &Context| BindingResult::new().text(todo.title.as_str()))
        .one(".done", |todo: &Todo, cx: &Context| {
            let (cx, id) = (cx.clone(), todo.id);
            BindingResult::new()
                .checked(todo.done)
                .on("change", move |_: &Event| {
                    cx.send(Action::Toggle(id));
                })
        })
        .one(".remove", |todo: &Todo, cx: &Context| {
            let (cx, id) = (cx.clone(), todo.id);
            BindingResult::new().on("click", move |_: &Event| {
                cx.send(Action::Remove(id));
            })
        })
}

/// Bind the page in `host` to `store` and render it once
pub fn mount(host: &Host, store: &Store<Todos>) -> Component<Todos> {
    let item = item(host);
    let app = Component::new(host, Options::new().store(store.clone()).container("#todos"))
        .one(".remaining", |todos: &Todos, _: &Context| {
            BindingResult::new().text(format!("({} left)", todos.remaining()))
        })
        .one(".list", move |todos: &Todos, _: &Context| {
            BindingResult::new().children(
                ChildrenSpec::each(todos.items.clone())
                    .key(|todo: &Todo, _| todo.id)
                    .component(item.clone()),
            )
        })
        .one(".empty", |todos: &Todos, _: &Context| BindingResult::new().visible(todos.items.is_empty()))
        .one("#add", |_: &Todos, cx: &Context| {
            let cx = cx.clone();
            BindingResult::new().on("click", move |_: &Event| {
                let host = cx.host();
                let Some(input) = host.query_one(cx.container(), "#new") else {
                    tracing::warn!("No #new input in {}", cx.container());
                    return;
                };
                let title = host.property(input, "value").to_text();
                if cx.send(Action::Add(title)) {
                    host.mutate(|tree| tree.set_property(input, "value", Value::from("")));
                }
            })
        });
    app.update();
    app
}

/// Type `title` into the new-todo input and press Add
pub fn add(host: &Host, title: &str) -> bool {
    let (Some(input), Some(button)) = (host.query_one(host.root(), "#new"), host.query_one(host.root(), "#add")) else {
        return false;
    };
    host.mutate(|tree| tree.set_property(input, "value", Value::from(title)));
    host.click(button)
}

/// The rendered list item for the todo at `index`
pub fn item_node(host: &Host, index: usize) -> Option<NodeId> {
    host.query_all(host.root(), ".list > li").get(index).copied()
}
