//! Components
//!
//! A [`Component`] is an ordered list of compiled bindings plus the options
//! it was built with. `update` resolves a model and a container, then runs
//! every binding in registration order.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use domk_dom::{NodeId, Value};

use crate::binding::{self, BindingSpec, CompiledBinding};
use crate::context::{Context, RootScope};
use crate::dispatch::DispatchEvent;
use crate::host::{Host, WeakHost};
use crate::model::{ModelSource, ObservableModel, Store};
use crate::subscription::Subscription;

/// Process-unique component identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

static NEXT_COMPONENT: AtomicU64 = AtomicU64::new(1);

impl ComponentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COMPONENT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Handler a parent reaches through `Context::invoke`
pub type RefHandler = Rc<dyn Fn(&[Value]) -> Value>;

type HandlerFactory<M> = Rc<dyn Fn(&Context, Rc<dyn Fn()>, &M) -> RefHandler>;
type UpdateObserver<M> = Rc<dyn Fn(&UpdateEvent<'_, M>)>;

/// Where a component renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Node(NodeId),
    /// Resolved against the document on every update
    Selector(String),
}

impl Container {
    fn resolve(&self, host: &Host) -> NodeId {
        match self {
            Container::Node(node) => *node,
            Container::Selector(selector) => match host.query_one(host.root(), selector) {
                Some(node) => node,
                None => {
                    tracing::debug!("Container {:?} not found; using the document root", selector);
                    host.root()
                }
            },
        }
    }
}

impl From<NodeId> for Container {
    fn from(node: NodeId) -> Self {
        Container::Node(node)
    }
}

impl From<&str> for Container {
    fn from(selector: &str) -> Self {
        Container::Selector(selector.to_string())
    }
}

impl From<String> for Container {
    fn from(selector: String) -> Self {
        Container::Selector(selector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Updating,
    Updated,
}

/// Passed to the `updating` and `updated` observers
pub struct UpdateEvent<'a, M> {
    pub kind: UpdateKind,
    pub component: ComponentId,
    pub container: NodeId,
    pub model: &'a M,
    pub context: &'a Context,
}

/// Component options
pub struct Options<M> {
    model: Option<ModelSource<M>>,
    container: Option<Container>,
    updating: Option<UpdateObserver<M>>,
    updated: Option<UpdateObserver<M>>,
    dispatched: Option<Rc<dyn Fn(&DispatchEvent)>>,
    handler: Option<HandlerFactory<M>>,
    init: Option<Rc<dyn Fn(Rc<dyn Fn()>)>>,
    props: HashMap<String, Rc<dyn Any>>,
}

impl<M> Default for Options<M> {
    fn default() -> Self {
        Self {
            model: None,
            container: None,
            updating: None,
            updated: None,
            dispatched: None,
            handler: None,
            init: None,
            props: HashMap::new(),
        }
    }
}

impl<M: 'static> Options<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: M) -> Self {
        self.model = Some(ModelSource::value(model));
        self
    }

    /// Model recomputed on every update
    pub fn model_fn(mut self, f: impl Fn() -> M + 'static) -> Self {
        self.model = Some(ModelSource::thunk(f));
        self
    }

    pub fn store(mut self, store: Store<M>) -> Self {
        self.model = Some(store.into());
        self
    }

    pub fn observable(mut self, model: impl ObservableModel<M> + 'static) -> Self {
        self.model = Some(ModelSource::observable(model));
        self
    }

    pub fn container(mut self, container: impl Into<Container>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn updating(mut self, observer: impl Fn(&UpdateEvent<'_, M>) + 'static) -> Self {
        self.updating = Some(Rc::new(observer));
        self
    }

    pub fn updated(mut self, observer: impl Fn(&UpdateEvent<'_, M>) + 'static) -> Self {
        self.updated = Some(Rc::new(observer));
        self
    }

    /// Observer called after every dispatch from this component's contexts
    pub fn dispatched(mut self, observer: impl Fn(&DispatchEvent) + 'static) -> Self {
        self.dispatched = Some(Rc::new(observer));
        self
    }

    /// Factory for the handler [`Component::with_ref`] registers. It gets the
    /// binding context, a callback re-rendering the component and the model.
    pub fn handler<H>(mut self, factory: impl Fn(&Context, Rc<dyn Fn()>, &M) -> H + 'static) -> Self
    where
        H: Fn(&[Value]) -> Value + 'static,
    {
        self.handler = Some(Rc::new(move |cx: &Context, rerender: Rc<dyn Fn()>, model: &M| {
            Rc::new(factory(cx, rerender, model)) as RefHandler
        }));
        self
    }

    /// Runs once before the first pass with a callback re-running `update`
    pub fn init(mut self, init: impl Fn(Rc<dyn Fn()>) + 'static) -> Self {
        self.init = Some(Rc::new(init));
        self
    }

    /// Static context property, readable with `Context::prop`
    pub fn prop<T: Any>(mut self, name: impl Into<String>, value: T) -> Self {
        self.props.insert(name.into(), Rc::new(value));
        self
    }
}

impl<M> fmt::Debug for Options<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("model", &self.model)
            .field("container", &self.container)
            .field("handler", &self.handler.is_some())
            .field("init", &self.init.is_some())
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct ComponentInner<M> {
    id: ComponentId,
    host: WeakHost,
    options: Options<M>,
    bindings: RefCell<Vec<CompiledBinding<M>>>,
    subscription: RefCell<Option<Subscription>>,
    observed: RefCell<Option<Rc<dyn ObservableModel<M>>>>,
    initialized: Cell<bool>,
}

/// Declarative binding unit. Re-renders triggered by events and stores hold
/// the component weakly, so keep a handle alive while it should update.
pub struct Component<M>(Rc<ComponentInner<M>>);

impl<M> Clone for Component<M> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

pub(crate) struct WeakComponent<M>(Weak<ComponentInner<M>>);

impl<M> WeakComponent<M> {
    pub(crate) fn upgrade(&self) -> Option<Component<M>> {
        self.0.upgrade().map(Component)
    }
}

impl<M> Clone for WeakComponent<M> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<M: 'static> Component<M> {
    pub fn new(host: &Host, options: Options<M>) -> Self {
        let id = ComponentId::next();
        tracing::debug!("Created {}", id);
        Self(Rc::new(ComponentInner {
            id,
            host: host.downgrade(),
            options,
            bindings: RefCell::new(Vec::new()),
            subscription: RefCell::new(None),
            observed: RefCell::new(None),
            initialized: Cell::new(false),
        }))
    }

    pub fn id(&self) -> ComponentId {
        self.0.id
    }

    pub(crate) fn downgrade(&self) -> WeakComponent<M> {
        WeakComponent(Rc::downgrade(&self.0))
    }

    /// Bind the first match of `selector`
    pub fn one(&self, selector: &str, spec: impl Into<BindingSpec<M>>) -> Self {
        self.register(false, selector, spec.into())
    }

    /// Bind every match of `selector`, in document order
    pub fn all(&self, selector: &str, spec: impl Into<BindingSpec<M>>) -> Self {
        self.register(true, selector, spec.into())
    }

    fn register(&self, all: bool, selector: &str, spec: BindingSpec<M>) -> Self {
        let binding = binding::compile(self, all, selector, spec);
        self.0.bindings.borrow_mut().push(binding);
        self.clone()
    }

    pub fn binding_count(&self) -> usize {
        self.0.bindings.borrow().len()
    }

    /// Render with the stored model and container
    pub fn update(&self) {
        self.render(None, None);
    }

    pub fn update_with(&self, model: M) {
        self.render(Some(ModelSource::value(model)), None);
    }

    pub fn update_in(&self, container: impl Into<Container>) {
        self.render(None, Some(container.into()));
    }

    pub fn update_source(&self, model: impl Into<ModelSource<M>>, container: Option<Container>) {
        self.render(Some(model.into()), container);
    }

    fn render(&self, source: Option<ModelSource<M>>, container: Option<Container>) {
        let Some(host) = self.0.host.upgrade() else {
            tracing::debug!("Host of {} is gone; update skipped", self.id());
            return;
        };
        let source = source.or_else(|| self.0.options.model.clone());
        let container = container.or_else(|| self.0.options.container.clone());
        let container_node = match &container {
            Some(container) => container.resolve(&host),
            None => host.root(),
        };

        let updater: Rc<dyn Fn()> = {
            let weak = self.downgrade();
            let (source, container) = (source.clone(), container.clone());
            Rc::new(move || {
                if let Some(component) = weak.upgrade() {
                    component.render(source.clone(), container.clone());
                }
            })
        };

        let (model, observable) = match source {
            Some(ModelSource::Value(model)) => (model, None),
            Some(ModelSource::Thunk(f)) => (Rc::new(f()), None),
            Some(ModelSource::Observable(observable)) => {
                self.observe(&host, &observable, updater.clone());
                (observable.get_state(), Some(observable))
            }
            None => match unit_model::<M>() {
                Some(model) => (model, None),
                None => {
                    tracing::debug!("{} has no model; update skipped", self.id());
                    return;
                }
            },
        };

        tracing::debug!("Updating {} in {}", self.id(), container_node);
        let cx = Context::root(RootScope {
            host: host.clone(),
            update: updater,
            container: container_node,
            component: self.id(),
            model: model.clone(),
            dispatcher: observable.and_then(|observable| observable.dispatcher()),
            dispatched: self.0.options.dispatched.clone(),
        });
        self.update_within(&model, &cx);
    }

    /// Subscribe to `observable` unless it is the model already observed.
    /// Notifications arriving during a dispatch join its batch.
    fn observe(&self, host: &Host, observable: &Rc<dyn ObservableModel<M>>, updater: Rc<dyn Fn()>) {
        let current = self
            .0
            .observed
            .borrow()
            .as_ref()
            .is_some_and(|observed| Rc::ptr_eq(observed, observable));
        if current {
            return;
        }
        let previous = self.0.subscription.borrow_mut().take();
        drop(previous);

        let (weak_host, id) = (host.downgrade(), self.id());
        let listener: Rc<dyn Fn()> = Rc::new(move || {
            let Some(host) = weak_host.upgrade() else { return };
            if host.with_batch(|batch| batch.depth()) > 0 {
                host.with_batch(|batch| batch.enqueue(id, updater.clone()));
            } else {
                updater();
            }
        });
        let subscription = observable.subscribe(listener);
        *self.0.subscription.borrow_mut() = Some(subscription);
        *self.0.observed.borrow_mut() = Some(observable.clone());
        tracing::debug!("{} subscribed to its model", id);
    }

    /// Run every binding against `model`, with the context's node (or
    /// container) as this component's container
    pub fn update_within(&self, model: &Rc<M>, cx: &Context) {
        let first_pass = !self.0.initialized.replace(true);
        if let Some(init) = self.0.options.init.clone().filter(|_| first_pass) {
            let weak = self.downgrade();
            init(Rc::new(move || {
                if let Some(component) = weak.upgrade() {
                    component.update();
                }
            }));
        }

        let update_container: Rc<dyn Fn()> = {
            let (weak, model, cx) = (self.downgrade(), model.clone(), cx.clone());
            Rc::new(move || {
                if let Some(component) = weak.upgrade() {
                    component.update_within(&model, &cx);
                }
            })
        };
        let cx = cx.for_component(self.id(), &self.0.options.props, update_container);

        self.observe_pass(UpdateKind::Updating, model, &cx);
        let bindings = self.0.bindings.borrow().clone();
        tracing::trace!("{}: {} binding(s) in {}", self.id(), bindings.len(), cx.container());
        for binding in &bindings {
            binding(model, &cx);
        }
        self.observe_pass(UpdateKind::Updated, model, &cx);
    }

    fn observe_pass(&self, kind: UpdateKind, model: &M, cx: &Context) {
        let observer = match kind {
            UpdateKind::Updating => &self.0.options.updating,
            UpdateKind::Updated => &self.0.options.updated,
        };
        if let Some(observer) = observer {
            observer(&UpdateEvent {
                kind,
                component: self.id(),
                container: cx.container(),
                model,
                context: cx,
            });
        }
    }

    /// Binding that renders this component into the matched node and
    /// registers the `handler` option's product under `id` for the parent's
    /// `Context::invoke`. Without a handler option it is a plain delegate.
    pub fn with_ref(&self, id: impl Into<String>) -> BindingSpec<M> {
        let Some(factory) = self.0.options.handler.clone() else {
            return self.clone().into();
        };
        let (id, component) = (id.into(), self.clone());
        BindingSpec::delegate(move |model: &Rc<M>, cx: &Context| {
            if cx.handler(&id).is_none() {
                let rerender: Rc<dyn Fn()> = {
                    let (component, model, cx) = (component.clone(), model.clone(), cx.clone());
                    Rc::new(move || component.update_within(&model, &cx))
                };
                cx.install_handler(&id, factory(cx, rerender, model));
            }
            component.update_within(model, cx);
        })
    }

    /// Binding that renders this component from a projection of the parent model
    pub fn with_model<P: 'static>(&self, project: impl Fn(&P, &Context) -> M + 'static) -> BindingSpec<P> {
        let component = self.clone();
        BindingSpec::Delegate(Rc::new(move |model: &Rc<P>, cx: &Context| {
            component.update_within(&Rc::new(project(model, cx)), cx);
        }))
    }
}

/// Components over `()` render without a model
fn unit_model<M: 'static>() -> Option<Rc<M>> {
    let unit: Rc<dyn Any> = Rc::new(());
    unit.downcast::<M>().ok()
}

impl<M> fmt::Debug for Component<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.0.id)
            .field("bindings", &self.0.bindings.borrow().len())
            .field("subscribed", &self.0.subscription.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_ids_are_unique() {
        let (a, b) = (ComponentId::next(), ComponentId::next());
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
        assert_eq!(format!("{a}"), format!("component#{}", a.as_u64()));
    }

    #[test]
    fn test_unit_model_only_for_unit() {
        assert!(unit_model::<()>().is_some());
        assert!(unit_model::<u32>().is_none());
    }

    #[test]
    fn test_container_conversions() {
        assert_eq!(Container::from("#app"), Container::Selector("#app".into()));
        let debug = format!("{:?}", Options::<()>::new().prop("theme", "dark").container("#app"));
        assert!(debug.contains("theme"));
    }

    #[test]
    fn test_one_and_all_register_in_order() {
        let host = Host::parse("<h1></h1>").unwrap();
        let component = Component::<()>::new(&host, Options::new())
            .one("h1", crate::result::BindingResult::new().text("a"))
            .all("h1", crate::result::BindingResult::new().text("b"));
        assert_eq!(component.binding_count(), 2);
        component.update();
        let h1 = host.query_one(host.root(), "h1").unwrap();
        assert_eq!(host.text_content(h1), "b");
    }

    #[test]
    fn test_missing_model_skips_update() {
        let host = Host::parse("<h1>x</h1>").unwrap();
        let component = Component::<u32>::new(&host, Options::new())
            .one("h1", |n: &u32, _: &Context| crate::result::BindingResult::new().text(*n));
        component.update();
        let h1 = host.query_one(host.root(), "h1").unwrap();
        assert_eq!(host.text_content(h1), "x");
        component.update_with(7);
        assert_eq!(host.text_content(h1), "7");
    }
}
