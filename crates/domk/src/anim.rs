//! Animation hooks for child lists
//!
//! The reconciler calls `exit` before detaching a node, `enter` after a new
//! node's first update, and `flip` for existing nodes that moved. The
//! structural change itself is always done by the reconciler.

use std::fmt;
use std::rc::Rc;

use domk_dom::NodeId;

use crate::children::Key;
use crate::host::Host;

pub trait Animation {
    fn enter(&self, _host: &Host, _node: NodeId, _key: &Key) {}
    fn exit(&self, _host: &Host, _node: NodeId, _key: &Key) {}
    fn flip(&self, _host: &Host, _node: NodeId, _key: &Key) {}
}

/// A bare function is an `enter` hook
impl<F> Animation for F
where
    F: Fn(&Host, NodeId, &Key),
{
    fn enter(&self, host: &Host, node: NodeId, key: &Key) {
        self(host, node, key)
    }
}

/// Ordered hooks; every hook runs, in order
#[derive(Clone, Default)]
pub struct AnimationSet(Vec<Rc<dyn Animation>>);

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, animation: impl Animation + 'static) -> Self {
        self.0.push(Rc::new(animation));
        self
    }

    pub fn push(&mut self, animation: Rc<dyn Animation>) {
        self.0.push(animation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn enter(&self, host: &Host, node: NodeId, key: &Key) {
        for anim in &self.0 {
            anim.enter(host, node, key);
        }
    }

    pub(crate) fn exit(&self, host: &Host, node: NodeId, key: &Key) {
        for anim in &self.0 {
            anim.exit(host, node, key);
        }
    }

    pub(crate) fn flip(&self, host: &Host, node: NodeId, key: &Key) {
        for anim in &self.0 {
            anim.flip(host, node, key);
        }
    }
}

impl fmt::Debug for AnimationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnimationSet").field(&self.0.len()).finish()
    }
}

impl From<Rc<dyn Animation>> for AnimationSet {
    fn from(animation: Rc<dyn Animation>) -> Self {
        Self(vec![animation])
    }
}

impl From<Vec<Rc<dyn Animation>>> for AnimationSet {
    fn from(animations: Vec<Rc<dyn Animation>>) -> Self {
        Self(animations)
    }
}
