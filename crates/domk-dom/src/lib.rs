//! domk DOM - Document Object Model
//!
//! Arena-allocated DOM tree that domk bindings mutate in place.
//! Nodes are addressed by [`NodeId`]. Freed arena slots are reused, but each
//! reuse bumps the slot's stamp, so a stale id can never alias a node created
//! later.

mod attributes;
mod classlist;
mod document;
mod event;
mod node;
mod operations;
mod serialize;
mod style;
mod tree;
mod value;

pub use attributes::{Attr, NamedNodeMap};
pub use classlist::DOMTokenList;
pub use document::Document;
pub use event::{Event, Listener};
pub use node::{ElementData, Node, NodeData};
pub use operations::{DomError, DomResult, NodeOperations};
pub use style::StyleDeclaration;
pub use tree::{Children, DomTree};
pub use value::Value;

/// Node identifier: arena index plus the stamp of the slot's current tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    stamp: u32,
}

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId::new(0, 0);

    /// Invalid/null node ID
    pub const NONE: NodeId = NodeId::new(u32::MAX, 0);

    #[inline]
    pub(crate) const fn new(index: u32, stamp: u32) -> Self {
        Self { index, stamp }
    }

    /// Check if this is a valid node ID
    #[inline]
    pub fn is_valid(self) -> bool {
        self.index != u32::MAX
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub(crate) fn stamp(self) -> u32 {
        self.stamp
    }

    #[inline]
    pub(crate) fn link(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.index)
        } else {
            f.write_str("#none")
        }
    }
}
