//! domk - declarative DOM binding
//!
//! Keeps an existing, pre-rendered document in sync with a model. A
//! [`Component`] is a list of selector-scoped bindings; each update pass
//! runs them in order and patches only what changed on the matched nodes,
//! reconciling keyed child lists against a captured template.
//!
//! ```no_run
//! use domk::{BindingResult, Context, Host};
//!
//! let host = Host::parse("<h1></h1>").unwrap();
//! let app = domk::component::<u32>(&host)
//!     .one("h1", |count: &u32, _: &Context| BindingResult::new().text(*count));
//! app.update_with(3);
//! ```

mod anim;
mod async_value;
mod binding;
mod children;
mod component;
mod config;
mod context;
mod dispatch;
mod dynamic;
mod error;
mod host;
mod model;
mod node_data;
mod query;
mod result;
mod subscription;
mod updater;

use std::rc::Rc;

pub use anim::{Animation, AnimationSet};
pub use async_value::{AsyncOptions, AsyncValue, async_value, stream_value};
pub use binding::BindingSpec;
pub use children::{ChildrenBuilder, ChildrenSpec, Key};
pub use component::{Component, ComponentId, Container, Options, RefHandler, UpdateEvent, UpdateKind};
pub use config::Config;
pub use context::Context;
pub use dispatch::DispatchEvent;
pub use dynamic::{DynamicSource, DynamicValue, Sink, ValueSource};
pub use error::{DomkError, Result};
pub use host::Host;
pub use model::{Dispatcher, ModelSource, ObservableModel, Store};
pub use query::THIS;
pub use result::{
    ATTRIBUTE_SHORTHANDS, BindingResult, ClassValue, Init, IntoBindingResult, PROPERTY_SHORTHANDS, StyleValue,
};
pub use subscription::Subscription;

pub use domk_dom::{Event, Listener, NodeId, Value};

/// Component with default options
pub fn component<M: 'static>(host: &Host) -> Component<M> {
    Component::new(host, Options::new())
}

/// Re-bind the owning component to each child model of a tree. The bound
/// node receives a copy of the component's container as its template.
pub fn nested<M: 'static>(model: impl Fn(&M, &Context) -> Vec<M> + 'static) -> BindingSpec<M> {
    BindingSpec::Nested {
        model: Rc::new(model),
        key: None,
    }
}

/// [`nested`] with keyed children
pub fn nested_keyed<M: 'static, K: Into<Value>>(
    model: impl Fn(&M, &Context) -> Vec<M> + 'static,
    key: impl Fn(&M, usize) -> K + 'static,
) -> BindingSpec<M> {
    BindingSpec::Nested {
        model: Rc::new(model),
        key: Some(Rc::new(move |child: &M, index: usize| key(child, index).into())),
    }
}

/// Binding whose result is a positionally keyed child list
pub fn children<M, C, R>(
    model: impl Fn(&M, &Context) -> Vec<C> + 'static,
    update: impl Fn(&C, &Context) -> R + 'static,
) -> BindingSpec<M>
where
    M: 'static,
    C: 'static,
    R: IntoBindingResult + 'static,
{
    let update = Rc::new(update);
    BindingSpec::computed(move |parent: &M, cx: &Context| {
        let update = update.clone();
        BindingResult::new().children(ChildrenSpec::each(model(parent, cx)).update(move |child: &C, cx: &Context| update(child, cx)))
    })
}

/// Binding whose result is a child list keyed by `key`
pub fn keyed_children<M, C, K, R>(
    model: impl Fn(&M, &Context) -> Vec<C> + 'static,
    key: impl Fn(&C, usize) -> K + 'static,
    update: impl Fn(&C, &Context) -> R + 'static,
) -> BindingSpec<M>
where
    M: 'static,
    C: 'static,
    K: Into<Value>,
    R: IntoBindingResult + 'static,
{
    let (key, update) = (Rc::new(key), Rc::new(update));
    BindingSpec::computed(move |parent: &M, cx: &Context| {
        let (key, update) = (key.clone(), update.clone());
        let children = ChildrenSpec::each(model(parent, cx))
            .key(move |child: &C, index: usize| key(child, index))
            .update(move |child: &C, cx: &Context| update(child, cx));
        BindingResult::new().children(children)
    })
}

/// Result with `count` children, each rendered from its index
pub fn children_count<R: IntoBindingResult + 'static>(
    count: usize,
    update: impl Fn(&usize, &Context) -> R + 'static,
) -> BindingResult {
    BindingResult::new().children(ChildrenSpec::count(count).update(update))
}

/// Child list whose items are rendered as text
pub fn text_children<M, C>(model: impl Fn(&M, &Context) -> Vec<C> + 'static) -> BindingSpec<M>
where
    M: 'static,
    C: Clone + Into<Value> + 'static,
{
    children(model, |item: &C, _: &Context| BindingResult::new().text(Into::<Value>::into(item.clone())))
}
