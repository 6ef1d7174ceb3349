//! Child list reconciliation
//!
//! Maps a list of child models onto clones of a captured template node.
//! Nodes are matched by key, so per-node state (a checked box, a focused
//! input) follows the item rather than the position.
//!
//! Reordering is a single backward sweep: walking the new list from the
//! end, a node is inserted before the previously placed one whenever it is
//! new, sits past the old list's end, or its key differs from the key that
//! used to occupy its position. Adjacent swaps, appends and removals take
//! the minimum number of moves; arbitrary permutations may take more.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use domk_dom::{NodeId, NodeOperations, Value};

use crate::anim::{Animation, AnimationSet};
use crate::component::Component;
use crate::context::Context;
use crate::node_data::BindingKey;
use crate::result::{BindingResult, IntoBindingResult};
use crate::updater;

/// Identity of a child within its list
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Self(value.to_text())
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self(index.to_string())
    }
}

/// Type-erased child list
pub(crate) trait ChildList {
    fn len(&self) -> usize;
    fn key(&self, index: usize) -> Key;
    /// Render child `index`; a returned result is applied to the child node
    fn update(&self, index: usize, cx: &Context) -> Option<BindingResult>;
}

pub(crate) type KeyFn<C> = Rc<dyn Fn(&C, usize) -> Value>;

enum ChildUpdate<C> {
    Function(Rc<dyn Fn(&C, &Context) -> Option<BindingResult>>),
    Component(Component<C>),
}

struct Items<C> {
    models: Vec<Rc<C>>,
    key: Option<KeyFn<C>>,
    update: ChildUpdate<C>,
}

impl<C: 'static> ChildList for Items<C> {
    fn len(&self) -> usize {
        self.models.len()
    }

    fn key(&self, index: usize) -> Key {
        match &self.key {
            Some(key) => Key::from(key(&self.models[index], index)),
            None => Key::from(index),
        }
    }

    fn update(&self, index: usize, cx: &Context) -> Option<BindingResult> {
        let model = &self.models[index];
        match &self.update {
            ChildUpdate::Function(f) => f(model, cx),
            ChildUpdate::Component(component) => {
                component.update_within(model, cx);
                None
            }
        }
    }
}

/// `children` descriptor of a binding result
#[derive(Clone)]
pub struct ChildrenSpec {
    pub(crate) list: Rc<dyn ChildList>,
    pub(crate) anim: AnimationSet,
}

impl ChildrenSpec {
    /// One child per item
    pub fn each<C: 'static>(items: impl IntoIterator<Item = C>) -> ChildrenBuilder<C> {
        ChildrenBuilder {
            models: items.into_iter().map(Rc::new).collect(),
            key: None,
            anim: AnimationSet::default(),
        }
    }

    /// Children for indices `0..count`
    pub fn count(count: usize) -> ChildrenBuilder<usize> {
        Self::each(0..count)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.len() == 0
    }
}

impl fmt::Debug for ChildrenSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildrenSpec")
            .field("len", &self.list.len())
            .field("anim", &self.anim)
            .finish()
    }
}

/// Builder returned by [`ChildrenSpec::each`]
#[must_use]
pub struct ChildrenBuilder<C> {
    models: Vec<Rc<C>>,
    key: Option<KeyFn<C>>,
    anim: AnimationSet,
}

impl<C: 'static> ChildrenBuilder<C> {
    /// Key accessor; keys default to the item index
    pub fn key<K: Into<Value>>(mut self, key: impl Fn(&C, usize) -> K + 'static) -> Self {
        self.key = Some(Rc::new(move |model: &C, index: usize| key(model, index).into()));
        self
    }

    pub(crate) fn key_fn(mut self, key: Option<KeyFn<C>>) -> Self {
        self.key = key;
        self
    }

    pub fn anim(mut self, anim: impl Into<AnimationSet>) -> Self {
        self.anim = anim.into();
        self
    }

    /// Add one animation to the set
    pub fn animate(mut self, animation: impl Animation + 'static) -> Self {
        self.anim.push(Rc::new(animation));
        self
    }

    /// Render each child with a binding function
    pub fn update<R: IntoBindingResult>(self, update: impl Fn(&C, &Context) -> R + 'static) -> ChildrenSpec {
        let update = ChildUpdate::Function(Rc::new(move |model: &C, cx: &Context| update(model, cx).into_binding_result()));
        self.finish(update)
    }

    /// Render each child with a component
    pub fn component(self, component: Component<C>) -> ChildrenSpec {
        self.finish(ChildUpdate::Component(component))
    }

    fn finish(self, update: ChildUpdate<C>) -> ChildrenSpec {
        ChildrenSpec {
            list: Rc::new(Items {
                models: self.models,
                key: self.key,
                update,
            }),
            anim: self.anim,
        }
    }
}

/// Reconcile the children of `parent` against `spec`
pub(crate) fn reconcile(cx: &Context, parent: NodeId, binding: BindingKey, template: NodeId, spec: &ChildrenSpec) {
    let host = cx.host();
    let list = &spec.list;
    let (prev_keys, mut prev_nodes) = host.with_nodes(|nodes| nodes.take_children(parent, binding));

    // Claim existing nodes by key, clone the template for new ones
    let mut keys = Vec::with_capacity(list.len());
    let mut indices = Vec::with_capacity(list.len());
    let mut nodes = HashMap::with_capacity(list.len());
    let mut fresh = HashSet::new();
    for index in 0..list.len() {
        let key = list.key(index);
        if nodes.contains_key(&key) {
            tracing::warn!("Duplicate child key {:?} under {}; skipping item {}", key.as_str(), parent, index);
            continue;
        }
        let child = match prev_nodes.remove(&key) {
            Some(child) => child,
            None => match host.mutate(|tree| tree.clone_node(template, true)) {
                Some(child) => {
                    fresh.insert(child);
                    child
                }
                None => continue,
            },
        };
        keys.push(key.clone());
        indices.push(index);
        nodes.insert(key, child);
    }

    // Remove nodes whose keys disappeared, in their old order
    let mut removed = 0;
    for key in &prev_keys {
        let Some(child) = prev_nodes.remove(key) else { continue };
        spec.anim.exit(host, child, key);
        host.remove_node(parent, child);
        removed += 1;
    }

    // Backward sweep: place, update, then run enter hooks for new nodes
    let mut anchor: Option<NodeId> = None;
    let mut moved = Vec::new();
    for pos in (0..keys.len()).rev() {
        let key = &keys[pos];
        let child = nodes[key];
        let is_fresh = fresh.contains(&child);
        if is_fresh || prev_keys.get(pos) != Some(key) {
            host.mutate(|tree| tree.insert_before(parent, child, anchor));
            if !is_fresh {
                moved.push((child, key.clone()));
            }
        }

        let child_cx = cx.for_child(child);
        if let Some(result) = list.update(indices[pos], &child_cx) {
            updater::update_node(&child_cx, child, BindingKey::Node(child), &result);
        }
        if is_fresh {
            spec.anim.enter(host, child, key);
        }
        anchor = Some(child);
    }

    for (child, key) in &moved {
        spec.anim.flip(host, *child, key);
    }

    tracing::trace!(
        "Reconciled {} children of {}: {} new, {} moved, {} removed",
        keys.len(),
        parent,
        fresh.len(),
        moved.len(),
        removed
    );
    host.with_nodes(|store| store.store_children(parent, binding, keys, nodes));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_default_to_index() {
        let spec = ChildrenSpec::each(vec!["a", "b"]).update(|_, _| ());
        assert_eq!(spec.list.key(1), Key::from("1"));
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn test_custom_keys_are_stringified() {
        let spec = ChildrenSpec::each(vec![(7, "x"), (9, "y")])
            .key(|item: &(i32, &str), _| item.0)
            .update(|_, _| ());
        assert_eq!(spec.list.key(0), Key::from("7"));
        assert_eq!(spec.list.key(1).to_string(), "9");
    }

    #[test]
    fn test_count_synthesizes_indices() {
        let spec = ChildrenSpec::count(3).update(|i: &usize, _| BindingResult::new().text(*i));
        assert_eq!(spec.len(), 3);
        assert!(!spec.is_empty());
        assert!(ChildrenSpec::count(0).update(|_, _| ()).is_empty());
    }
}
