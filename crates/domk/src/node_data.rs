//! Node data store
//!
//! Side tables keyed by `NodeId`: initial attribute text, per-binding list
//! state, previously written values, live dynamic-value subscriptions, and
//! per-(container, component) scopes for handlers and local state.
//! A reused arena slot gets a fresh `NodeId` stamp, so records are simply
//! dropped when the engine detaches a subtree.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use domk_dom::{Listener, NodeId, Value};

use crate::children::Key;
use crate::component::{ComponentId, RefHandler};
use crate::dynamic::{DynamicValue, ValueSource};
use crate::result::{ClassValue, StyleValue};
use crate::subscription::Subscription;

/// Identifies whose state a node record holds: a compiled binding, or the
/// per-child key used by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum BindingKey {
    Binding(u64),
    Node(NodeId),
}

/// Template capture state of a list node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Template {
    #[default]
    Pending,
    Captured(NodeId),
    Missing,
}

#[derive(Debug, Default)]
struct BindingState {
    initialized: bool,
    template: Template,
    keys: Vec<Key>,
    nodes: HashMap<Key, NodeId>,
}

/// Original `class`/`style` attribute text, captured on first touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InitialData {
    pub class: String,
    pub style: String,
}

/// Last value written through a previous-value slot
#[derive(Debug, Clone)]
pub(crate) enum Previous {
    Value(Value),
    Dynamic(DynamicValue),
    Listener(Listener),
    Class(ClassValue),
    Style(StyleValue),
}

impl Previous {
    pub(crate) fn same_as(&self, other: &Previous) -> bool {
        match (self, other) {
            (Previous::Value(a), Previous::Value(b)) => a == b,
            (Previous::Dynamic(a), Previous::Dynamic(b)) => a.ptr_eq(b),
            (Previous::Listener(a), Previous::Listener(b)) => a.ptr_eq(b),
            (Previous::Class(a), Previous::Class(b)) => a.shallow_eq(b),
            (Previous::Style(a), Previous::Style(b)) => a.shallow_eq(b),
            _ => false,
        }
    }
}

impl From<&ValueSource> for Previous {
    fn from(source: &ValueSource) -> Self {
        match source {
            ValueSource::Static(v) => Previous::Value(v.clone()),
            ValueSource::Dynamic(d) => Previous::Dynamic(d.clone()),
        }
    }
}

struct DynamicSlot {
    generation: u64,
    subscription: Option<Subscription>,
}

#[derive(Default)]
struct NodeRecord {
    initial: Option<InitialData>,
    content_initialized: bool,
    bindings: HashMap<BindingKey, BindingState>,
    previous: HashMap<String, Previous>,
    dynamic: HashMap<String, DynamicSlot>,
}

#[derive(Default)]
struct Scope {
    handlers: HashMap<String, RefHandler>,
    state: HashMap<TypeId, Rc<dyn Any>>,
}

/// Records taken out of the store. Dropping this cancels their
/// subscriptions, so it must be dropped after the store borrow ends.
#[must_use]
pub(crate) struct Released {
    records: Vec<NodeRecord>,
    scopes: Vec<Scope>,
}

impl Released {
    pub(crate) fn len(&self) -> usize {
        self.records.len() + self.scopes.len()
    }
}

#[derive(Default)]
pub(crate) struct NodeDataStore {
    records: HashMap<NodeId, NodeRecord>,
    scopes: HashMap<(NodeId, ComponentId), Scope>,
    next_generation: u64,
}

impl NodeDataStore {
    fn record(&mut self, node: NodeId) -> &mut NodeRecord {
        self.records.entry(node).or_default()
    }

    fn binding(&mut self, node: NodeId, binding: BindingKey) -> &mut BindingState {
        self.record(node).bindings.entry(binding).or_default()
    }

    pub(crate) fn has_record(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    pub(crate) fn initial_data(&self, node: NodeId) -> Option<InitialData> {
        self.records.get(&node).and_then(|r| r.initial.clone())
    }

    /// Store initial data unless already captured; returns the stored value
    pub(crate) fn set_initial_data(&mut self, node: NodeId, data: InitialData) -> InitialData {
        self.record(node).initial.get_or_insert(data).clone()
    }

    /// Marks the binding initialized; true only the first time
    pub(crate) fn begin_init(&mut self, node: NodeId, binding: BindingKey) -> bool {
        let state = self.binding(node, binding);
        !std::mem::replace(&mut state.initialized, true)
    }

    /// Claims the node's one-time content initialization
    pub(crate) fn claim_content(&mut self, node: NodeId) -> bool {
        let record = self.record(node);
        !std::mem::replace(&mut record.content_initialized, true)
    }

    /// Records `next` in `slot`; false when it equals the previous value
    pub(crate) fn refresh(&mut self, node: NodeId, slot: &str, next: Previous) -> bool {
        let record = self.record(node);
        if record.previous.get(slot).is_some_and(|prev| prev.same_as(&next)) {
            return false;
        }
        record.previous.insert(slot.to_string(), next);
        true
    }

    /// Records a listener; `None` when unchanged, otherwise the one it replaced
    pub(crate) fn replace_listener(
        &mut self,
        node: NodeId,
        slot: &str,
        listener: &Listener,
    ) -> Option<Option<Listener>> {
        let record = self.record(node);
        if let Some(Previous::Listener(prev)) = record.previous.get(slot) {
            if prev.ptr_eq(listener) {
                return None;
            }
        }
        match record.previous.insert(slot.to_string(), Previous::Listener(listener.clone())) {
            Some(Previous::Listener(old)) => Some(Some(old)),
            _ => Some(None),
        }
    }

    // ------------------------------------------------------------------
    // Child lists
    // ------------------------------------------------------------------

    pub(crate) fn template(&self, node: NodeId, binding: BindingKey) -> Template {
        self.records
            .get(&node)
            .and_then(|r| r.bindings.get(&binding))
            .map_or(Template::Pending, |b| b.template)
    }

    pub(crate) fn set_template(&mut self, node: NodeId, binding: BindingKey, template: Template) {
        self.binding(node, binding).template = template;
    }

    /// Moves the previous key list and key map out for reconciliation
    pub(crate) fn take_children(
        &mut self,
        node: NodeId,
        binding: BindingKey,
    ) -> (Vec<Key>, HashMap<Key, NodeId>) {
        let state = self.binding(node, binding);
        (std::mem::take(&mut state.keys), std::mem::take(&mut state.nodes))
    }

    pub(crate) fn store_children(
        &mut self,
        node: NodeId,
        binding: BindingKey,
        keys: Vec<Key>,
        nodes: HashMap<Key, NodeId>,
    ) {
        let state = self.binding(node, binding);
        state.keys = keys;
        state.nodes = nodes;
    }

    /// Keys of every list rendered into `node`, in binding order
    pub(crate) fn child_keys(&self, node: NodeId) -> Vec<Key> {
        let Some(record) = self.records.get(&node) else {
            return Vec::new();
        };
        let mut bindings: Vec<_> = record.bindings.iter().collect();
        bindings.sort_by_key(|(key, _)| **key);
        bindings.into_iter().flat_map(|(_, b)| b.keys.iter().cloned()).collect()
    }

    /// Node for `key` in a list rendered into `node`
    pub(crate) fn child_node(&self, node: NodeId, key: &Key) -> Option<NodeId> {
        let record = self.records.get(&node)?;
        record.bindings.values().find_map(|b| b.nodes.get(key).copied())
    }

    // ------------------------------------------------------------------
    // Dynamic values
    // ------------------------------------------------------------------

    /// Starts a new registration for `slot`. Returns its generation token
    /// and the superseded subscription, to be dropped by the caller.
    pub(crate) fn begin_dynamic(&mut self, node: NodeId, slot: &str) -> (u64, Option<Subscription>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = self
            .record(node)
            .dynamic
            .entry(slot.to_string())
            .or_insert(DynamicSlot {
                generation,
                subscription: None,
            });
        entry.generation = generation;
        (generation, entry.subscription.take())
    }

    pub(crate) fn is_current(&self, node: NodeId, slot: &str, generation: u64) -> bool {
        self.records
            .get(&node)
            .and_then(|r| r.dynamic.get(slot))
            .is_some_and(|s| s.generation == generation)
    }

    /// Keeps `subscription` alive for `slot`, or hands it back when a newer
    /// registration already replaced this one
    pub(crate) fn attach(
        &mut self,
        node: NodeId,
        slot: &str,
        generation: u64,
        subscription: Subscription,
    ) -> Option<Subscription> {
        match self.records.get_mut(&node).and_then(|r| r.dynamic.get_mut(slot)) {
            Some(entry) if entry.generation == generation => {
                entry.subscription = Some(subscription);
                None
            }
            _ => Some(subscription),
        }
    }

    /// Ends any registration for `slot` so later deliveries are ignored
    pub(crate) fn retire_dynamic(&mut self, node: NodeId, slot: &str) -> Option<Subscription> {
        self.records
            .get_mut(&node)
            .and_then(|r| r.dynamic.remove(slot))
            .and_then(|s| s.subscription)
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub(crate) fn handler(&self, container: NodeId, component: ComponentId, id: &str) -> Option<RefHandler> {
        self.scopes
            .get(&(container, component))
            .and_then(|s| s.handlers.get(id).cloned())
    }

    /// Installs a handler unless one is registered under `id` already
    pub(crate) fn install_handler(
        &mut self,
        container: NodeId,
        component: ComponentId,
        id: &str,
        handler: RefHandler,
    ) -> bool {
        let scope = self.scopes.entry((container, component)).or_default();
        if scope.handlers.contains_key(id) {
            return false;
        }
        scope.handlers.insert(id.to_string(), handler);
        true
    }

    pub(crate) fn scope_state(
        &self,
        container: NodeId,
        component: ComponentId,
        type_id: TypeId,
    ) -> Option<Rc<dyn Any>> {
        self.scopes
            .get(&(container, component))
            .and_then(|s| s.state.get(&type_id).cloned())
    }

    /// Inserts state unless present; returns whichever value is stored
    pub(crate) fn insert_scope_state(
        &mut self,
        container: NodeId,
        component: ComponentId,
        type_id: TypeId,
        value: Rc<dyn Any>,
    ) -> Rc<dyn Any> {
        self.scopes
            .entry((container, component))
            .or_default()
            .state
            .entry(type_id)
            .or_insert(value)
            .clone()
    }

    // ------------------------------------------------------------------
    // Release
    // ------------------------------------------------------------------

    /// Takes out every record and scope belonging to `nodes`
    pub(crate) fn release(&mut self, nodes: &[NodeId]) -> Released {
        let records = nodes.iter().filter_map(|n| self.records.remove(n)).collect();
        let doomed: Vec<_> = self
            .scopes
            .keys()
            .filter(|(container, _)| nodes.contains(container))
            .copied()
            .collect();
        let scopes = doomed.iter().filter_map(|k| self.scopes.remove(k)).collect();
        Released { records, scopes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        domk_dom::DomTree::new().create_element("div")
    }

    #[test]
    fn test_refresh_skips_equal_values() {
        let mut store = NodeDataStore::default();
        let div = node();
        assert!(store.refresh(div, "text", Previous::Value(Value::from(1))));
        assert!(!store.refresh(div, "text", Previous::Value(Value::from(1))));
        assert!(store.refresh(div, "text", Previous::Value(Value::from(2))));
    }

    #[test]
    fn test_listener_replacement() {
        let mut store = NodeDataStore::default();
        let div = node();
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        assert!(matches!(store.replace_listener(div, "e:click", &a), Some(None)));
        assert!(store.replace_listener(div, "e:click", &a).is_none());
        let replaced = store.replace_listener(div, "e:click", &b).flatten().unwrap();
        assert!(replaced.ptr_eq(&a));
    }

    #[test]
    fn test_init_claims_once() {
        let mut store = NodeDataStore::default();
        let div = node();
        assert!(store.begin_init(div, BindingKey::Binding(1)));
        assert!(!store.begin_init(div, BindingKey::Binding(1)));
        assert!(store.begin_init(div, BindingKey::Binding(2)));
        assert!(store.claim_content(div));
        assert!(!store.claim_content(div));
    }

    #[test]
    fn test_dynamic_generations() {
        let mut store = NodeDataStore::default();
        let div = node();
        let (first, _) = store.begin_dynamic(div, "text");
        let (second, _) = store.begin_dynamic(div, "text");
        assert!(!store.is_current(div, "text", first));
        assert!(store.is_current(div, "text", second));
        let late = store.attach(div, "text", first, Subscription::empty());
        assert!(late.is_some());
        assert!(store.retire_dynamic(div, "text").is_none());
        assert!(!store.is_current(div, "text", second));
    }

    #[test]
    fn test_release_drops_records_and_scopes() {
        let mut store = NodeDataStore::default();
        let div = node();
        store.refresh(div, "text", Previous::Value(Value::Null));
        let component = ComponentId::next();
        let handler: RefHandler = Rc::new(|_: &[Value]| Value::Null);
        assert!(store.install_handler(div, component, "h", handler.clone()));
        assert!(!store.install_handler(div, component, "h", handler));
        let released = store.release(&[div]);
        assert_eq!(released.len(), 2);
        assert!(!store.has_record(div));
        assert!(store.handler(div, component, "h").is_none());
    }
}
