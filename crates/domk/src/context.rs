//! Binding context
//!
//! The data threaded through every binding invocation: the host, the
//! current container and node, the root model and updater, and the entry
//! points for dispatch, scoped state and component references.

use std::any::{Any, TypeId, type_name, type_name_of_val};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use domk_dom::{NodeId, Value};
use smol::Task;

use crate::component::{ComponentId, RefHandler};
use crate::dispatch::{DispatchEvent, DispatchScope, InFlight, Settle};
use crate::host::Host;
use crate::model::Dispatcher;

pub(crate) type Props = Rc<HashMap<String, Rc<dyn Any>>>;

/// Per-update state shared by every context derived from one root update
pub(crate) struct RootScope {
    pub host: Host,
    pub update: Rc<dyn Fn()>,
    pub container: NodeId,
    pub component: ComponentId,
    pub model: Rc<dyn Any>,
    pub dispatcher: Option<Dispatcher>,
    pub dispatched: Option<Rc<dyn Fn(&DispatchEvent)>>,
}

#[derive(Clone)]
pub struct Context {
    root: Rc<RootScope>,
    container: NodeId,
    node: Option<NodeId>,
    parent: Option<NodeId>,
    component: ComponentId,
    props: Props,
    update_container: Option<Rc<dyn Fn()>>,
    update_node: Option<Rc<dyn Fn()>>,
    in_flight: Option<Rc<InFlight>>,
}

impl Context {
    pub(crate) fn root(root: RootScope) -> Self {
        let (container, component) = (root.container, root.component);
        Self {
            root: Rc::new(root),
            container,
            node: None,
            parent: None,
            component,
            props: Props::default(),
            update_container: None,
            update_node: None,
            in_flight: None,
        }
    }

    pub fn host(&self) -> &Host {
        &self.root.host
    }

    /// Node the current component is bound to
    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Node the current binding is applied to; the container outside bindings
    pub fn node(&self) -> NodeId {
        self.node.unwrap_or(self.container)
    }

    /// List node, for contexts of reconciled children
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn root_container(&self) -> NodeId {
        self.root.container
    }

    pub fn root_component(&self) -> ComponentId {
        self.root.component
    }

    /// Model the root component rendered from, if it is a `T`
    pub fn root_model<T: 'static>(&self) -> Option<Rc<T>> {
        self.root.model.clone().downcast::<T>().ok()
    }

    /// Context property set through `Options::prop`
    pub fn prop<T: 'static>(&self, name: &str) -> Option<Rc<T>> {
        self.props.get(name)?.clone().downcast::<T>().ok()
    }

    /// Re-run the root component's update
    pub fn update(&self) {
        (self.root.update)();
    }

    /// Re-render the current component against the same model
    pub fn update_container(&self) {
        if let Some(update) = &self.update_container {
            update();
        }
    }

    /// Re-run the current binding for the current node only
    pub fn update_node(&self) {
        if let Some(update) = &self.update_node {
            update();
        }
    }

    /// Callback form of [`update_node`](Self::update_node)
    pub fn node_updater(&self) -> Rc<dyn Fn()> {
        match &self.update_node {
            Some(update) => update.clone(),
            None => Rc::new(|| {}),
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Run `action` inside a dispatch transaction and schedule a re-render
    /// of the root component for when the outermost dispatch returns
    pub fn dispatch<P, R>(&self, action: impl FnOnce(P, &Context) -> R, payload: P) -> R {
        let scope = DispatchScope::enter(self, type_name_of_val(&action));
        let result = action(payload, self);
        // Inside an async dispatch the root renders once, when it settles
        if self.in_flight.is_none() {
            scope.enqueue_root();
        }
        result
    }

    /// Like [`dispatch`](Self::dispatch) for actions returning a future.
    ///
    /// The future runs to completion on the host executor and the root
    /// re-renders once it settles, whether or not the returned task is kept.
    /// Dispatches made through the action's context, before or after it
    /// awaits, join this dispatch: the root renders once, after the last of
    /// them settles. The task yields the action's output, or `None` if the
    /// executor dropped the action first.
    pub fn dispatch_async<P, F>(&self, action: impl FnOnce(P, &Context) -> F, payload: P) -> Task<Option<F::Output>>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let in_flight = match &self.in_flight {
            Some(outer) => {
                outer.join();
                outer.clone()
            }
            None => InFlight::new(self),
        };
        let cx = Self {
            in_flight: Some(in_flight.clone()),
            ..self.clone()
        };
        let future = {
            let _scope = DispatchScope::enter(&cx, type_name_of_val(&action));
            action(payload, &cx)
        };
        tracing::trace!("Async dispatch started ({} in flight)", in_flight.outstanding());

        let (sender, receiver) = smol::channel::bounded(1);
        let settle = Settle(in_flight);
        self.host()
            .spawn(async move {
                let output = future.await;
                drop(settle);
                // Nobody may be waiting for the result
                let _ = sender.try_send(output);
            })
            .detach();
        self.host().spawn(async move { receiver.recv().await.ok() })
    }

    /// Hand `message` to the observable model's dispatcher. Returns false
    /// when the model has none.
    pub fn send<T: Any>(&self, message: T) -> bool {
        let Some(dispatcher) = self.root.dispatcher.clone() else {
            tracing::warn!("No model dispatcher for message {}", type_name::<T>());
            return false;
        };
        let _scope = DispatchScope::enter(self, type_name::<T>());
        dispatcher(Box::new(message));
        true
    }

    pub(crate) fn root_updater(&self) -> (ComponentId, Rc<dyn Fn()>) {
        (self.root.component, self.root.update.clone())
    }

    pub(crate) fn dispatched_observer(&self) -> Option<Rc<dyn Fn(&DispatchEvent)>> {
        self.root.dispatched.clone()
    }

    // ------------------------------------------------------------------
    // Scoped state
    // ------------------------------------------------------------------

    /// State of type `T` scoped to the current container and component,
    /// created with `init` on first use
    pub fn state<T: 'static>(&self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let (container, component, key) = (self.container, self.component, TypeId::of::<RefCell<T>>());
        let existing = self
            .host()
            .with_nodes(|nodes| nodes.scope_state(container, component, key));
        if let Some(state) = existing.and_then(|s| s.downcast::<RefCell<T>>().ok()) {
            return state;
        }
        let fresh = Rc::new(RefCell::new(init()));
        let stored: Rc<dyn Any> = fresh.clone();
        self.host()
            .with_nodes(|nodes| nodes.insert_scope_state(container, component, key, stored));
        fresh
    }

    /// Call the handler registered under `id` by `Component::with_ref`
    pub fn invoke(&self, id: &str, args: &[Value]) -> Option<Value> {
        let handler = self.handler(id);
        match handler {
            Some(handler) => Some(handler(args)),
            None => {
                tracing::debug!("No handler registered as {:?}", id);
                None
            }
        }
    }

    pub(crate) fn handler(&self, id: &str) -> Option<RefHandler> {
        self.host()
            .with_nodes(|nodes| nodes.handler(self.container, self.component, id))
    }

    pub(crate) fn install_handler(&self, id: &str, handler: RefHandler) -> bool {
        self.host()
            .with_nodes(|nodes| nodes.install_handler(self.container, self.component, id, handler))
    }

    // ------------------------------------------------------------------
    // Derivation
    // ------------------------------------------------------------------

    /// Context for a component pass: the node (or container) becomes the
    /// container, static props sit under incoming ones
    pub(crate) fn for_component(
        &self,
        component: ComponentId,
        props: &HashMap<String, Rc<dyn Any>>,
        update_container: Rc<dyn Fn()>,
    ) -> Self {
        let merged = if props.is_empty() {
            self.props.clone()
        } else {
            let mut merged = props.clone();
            merged.extend(self.props.iter().map(|(k, v)| (k.clone(), v.clone())));
            Rc::new(merged)
        };
        Self {
            root: self.root.clone(),
            container: self.node(),
            node: None,
            parent: self.parent,
            component,
            props: merged,
            update_container: Some(update_container),
            update_node: None,
            in_flight: self.in_flight.clone(),
        }
    }

    /// Context for a binding applied to `node`
    pub(crate) fn with_node(&self, node: NodeId, update_node: Option<Rc<dyn Fn()>>) -> Self {
        Self {
            node: Some(node),
            update_node,
            ..self.clone()
        }
    }

    /// Context for a reconciled child of the list node
    pub(crate) fn for_child(&self, child: NodeId) -> Self {
        Self {
            parent: Some(self.node()),
            node: Some(child),
            update_node: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("container", &self.container)
            .field("node", &self.node)
            .field("parent", &self.parent)
            .field("component", &self.component)
            .field("root_component", &self.root.component)
            .finish_non_exhaustive()
    }
}
