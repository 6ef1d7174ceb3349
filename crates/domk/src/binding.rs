//! Binding compiler
//!
//! Turns a [`BindingSpec`] into the closure a component runs on every
//! update pass. The binding kind is resolved once, at `one`/`all` time.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use domk_dom::NodeId;

use crate::children::{ChildrenSpec, KeyFn};
use crate::component::Component;
use crate::context::Context;
use crate::node_data::BindingKey;
use crate::result::{BindingResult, Init, IntoBindingResult};
use crate::updater;

/// Runs one registered binding against a model
pub(crate) type CompiledBinding<M> = Rc<dyn Fn(&Rc<M>, &Context)>;

type Computation<M> = Rc<dyn Fn(&Rc<M>, &Context) -> Option<BindingResult>>;
type Delegate<M> = Rc<dyn Fn(&Rc<M>, &Context)>;

/// What a binding does with each matched node
pub enum BindingSpec<M> {
    /// The same result on every pass
    Literal(Rc<BindingResult>),
    /// A result computed from the model; `None` changes nothing
    Computed(Rc<dyn Fn(&M, &Context) -> Option<BindingResult>>),
    /// A child component (fed the model or a projection of it), or a custom
    /// delegate, run with the node as container
    Delegate(Delegate<M>),
    /// HTML inserted once as initial content
    Template(String),
    /// The owning component, re-bound to child models of a tree
    Nested {
        model: Rc<dyn Fn(&M, &Context) -> Vec<M>>,
        key: Option<KeyFn<M>>,
    },
}

impl<M> Clone for BindingSpec<M> {
    fn clone(&self) -> Self {
        match self {
            BindingSpec::Literal(result) => BindingSpec::Literal(result.clone()),
            BindingSpec::Computed(f) => BindingSpec::Computed(f.clone()),
            BindingSpec::Delegate(f) => BindingSpec::Delegate(f.clone()),
            BindingSpec::Template(html) => BindingSpec::Template(html.clone()),
            BindingSpec::Nested { model, key } => BindingSpec::Nested {
                model: model.clone(),
                key: key.clone(),
            },
        }
    }
}

impl<M> fmt::Debug for BindingSpec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingSpec::Literal(result) => f.debug_tuple("Literal").field(result).finish(),
            BindingSpec::Computed(_) => f.write_str("Computed"),
            BindingSpec::Delegate(_) => f.write_str("Delegate"),
            BindingSpec::Template(html) => f.debug_tuple("Template").field(html).finish(),
            BindingSpec::Nested { key, .. } => f
                .debug_struct("Nested")
                .field("keyed", &key.is_some())
                .finish_non_exhaustive(),
        }
    }
}

impl<M: 'static> BindingSpec<M> {
    /// Compute a result from the model on every pass
    pub fn computed<R: IntoBindingResult>(f: impl Fn(&M, &Context) -> R + 'static) -> Self {
        BindingSpec::Computed(Rc::new(move |model: &M, cx: &Context| f(model, cx).into_binding_result()))
    }

    /// Run `f` for every matched node; the context's node is the match
    pub fn delegate(f: impl Fn(&Rc<M>, &Context) + 'static) -> Self {
        BindingSpec::Delegate(Rc::new(f))
    }
}

impl<M> From<BindingResult> for BindingSpec<M> {
    fn from(result: BindingResult) -> Self {
        BindingSpec::Literal(Rc::new(result))
    }
}

impl<M: 'static, F, R> From<F> for BindingSpec<M>
where
    F: Fn(&M, &Context) -> R + 'static,
    R: IntoBindingResult,
{
    fn from(f: F) -> Self {
        BindingSpec::computed(f)
    }
}

impl<M: 'static> From<Component<M>> for BindingSpec<M> {
    fn from(component: Component<M>) -> Self {
        BindingSpec::Delegate(Rc::new(move |model: &Rc<M>, cx: &Context| component.update_within(model, cx)))
    }
}

impl<M> From<&str> for BindingSpec<M> {
    fn from(html: &str) -> Self {
        BindingSpec::Template(html.to_string())
    }
}

impl<M> From<String> for BindingSpec<M> {
    fn from(html: String) -> Self {
        BindingSpec::Template(html)
    }
}

static NEXT_BINDING: AtomicU64 = AtomicU64::new(1);

/// Compile `spec` for `owner`, matching `selector` against each container
pub(crate) fn compile<M: 'static>(
    owner: &Component<M>,
    all: bool,
    selector: &str,
    spec: BindingSpec<M>,
) -> CompiledBinding<M> {
    let selector = Rc::<str>::from(selector);
    let key = BindingKey::Binding(NEXT_BINDING.fetch_add(1, Ordering::Relaxed));
    tracing::trace!("Compiling {:?} binding for {:?} (all: {})", spec, selector, all);

    match spec {
        BindingSpec::Literal(result) => {
            computed(selector, all, key, Rc::new(move |_: &Rc<M>, _: &Context| Some((*result).clone())))
        }
        BindingSpec::Computed(f) => computed(selector, all, key, Rc::new(move |model: &Rc<M>, cx: &Context| f(model, cx))),
        BindingSpec::Delegate(f) => delegated(selector, all, f),
        BindingSpec::Template(html) => {
            let result = BindingResult::new().init(Init::Html(html));
            computed(selector, all, key, Rc::new(move |_: &Rc<M>, _: &Context| Some(result.clone())))
        }
        BindingSpec::Nested { model, key: child_key } => {
            let owner = owner.downgrade();
            let compute: Computation<M> = Rc::new(move |parent: &Rc<M>, cx: &Context| {
                let component = owner.upgrade()?;
                let children = ChildrenSpec::each(model(parent, cx))
                    .key_fn(child_key.clone())
                    .component(component);
                Some(BindingResult::new().init(Init::Node(cx.container())).children(children))
            });
            computed(selector, all, key, compute)
        }
    }
}

fn delegated<M: 'static>(selector: Rc<str>, all: bool, delegate: Delegate<M>) -> CompiledBinding<M> {
    Rc::new(move |model: &Rc<M>, cx: &Context| {
        for node in cx.host().query(cx.container(), &selector, all) {
            delegate(model, &cx.with_node(node, None));
        }
    })
}

fn computed<M: 'static>(selector: Rc<str>, all: bool, key: BindingKey, compute: Computation<M>) -> CompiledBinding<M> {
    Rc::new(move |model: &Rc<M>, cx: &Context| {
        for node in cx.host().query(cx.container(), &selector, all) {
            let binding = Rc::new(NodeBinding {
                node,
                key,
                compute: compute.clone(),
                model: model.clone(),
                cx: cx.clone(),
            });
            binding.run();
        }
    })
}

/// One computed binding applied to one node, re-runnable through
/// `Context::update_node`
struct NodeBinding<M> {
    node: NodeId,
    key: BindingKey,
    compute: Computation<M>,
    model: Rc<M>,
    cx: Context,
}

impl<M: 'static> NodeBinding<M> {
    fn run(self: &Rc<Self>) {
        let this = self.clone();
        let rerun: Rc<dyn Fn()> = Rc::new(move || this.run());
        let cx = self.cx.with_node(self.node, Some(rerun));
        if let Some(result) = (self.compute)(&self.model, &cx) {
            updater::update_node(&cx, self.node, self.key, &result);
        }
    }
}
