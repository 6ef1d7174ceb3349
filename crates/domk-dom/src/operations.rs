//! DOM Node Operations
//!
//! Core node manipulation: appendChild, removeChild, insertBefore,
//! replaceChild, cloneNode.

use crate::{DomTree, Node, NodeData, NodeId};

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} not found")]
    NotFound(NodeId),
    /// Inserting a node into itself or its own descendant, or under a leaf
    #[error("hierarchy request error")]
    HierarchyRequest,
    #[error("invalid node type")]
    InvalidNodeType,
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// Node operations trait
pub trait NodeOperations {
    /// Append a child node, detaching it from its previous parent
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId>;

    /// Remove a child node
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId>;

    /// Insert before a reference node; `None` appends
    fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId>;

    /// Replace a child with another node, returns the old child
    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId>;

    /// Clone a node into a new detached node
    fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId>;
}

impl NodeOperations for DomTree {
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        let node = self.get(child).ok_or(DomError::NotFound(child))?;
        if node.parent != parent {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(child)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId> {
        let parent_node = self.get(parent).ok_or(DomError::NotFound(parent))?;
        if !parent_node.is_container() {
            return Err(DomError::HierarchyRequest);
        }
        let child_node = self.get(new_child).ok_or(DomError::NotFound(new_child))?;
        if matches!(child_node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest);
        }
        if self.is_inclusive_ancestor(new_child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = ref_child {
            let ref_node = self.get(reference).ok_or(DomError::NotFound(reference))?;
            if ref_node.parent != parent {
                return Err(DomError::NotAChild { parent, child: reference });
            }
            if reference == new_child {
                return Ok(new_child);
            }
        }

        self.detach(new_child);

        let (prev, next) = match ref_child {
            Some(reference) => (self.nodes[reference.index()].prev_sibling, reference),
            None => (self.nodes[parent.index()].last_child, NodeId::NONE),
        };
        {
            let node = &mut self.nodes[new_child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        match prev.link() {
            Some(p) => self.nodes[p.index()].next_sibling = new_child,
            None => self.nodes[parent.index()].first_child = new_child,
        }
        match next.link() {
            Some(n) => self.nodes[n.index()].prev_sibling = new_child,
            None => self.nodes[parent.index()].last_child = new_child,
        }
        self.touch();
        Ok(new_child)
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        if new_child == old_child {
            return Ok(old_child);
        }
        let anchor = self
            .get(old_child)
            .filter(|n| n.parent == parent)
            .ok_or(DomError::NotAChild { parent, child: old_child })?
            .next_sibling
            .link();
        let anchor = if anchor == Some(new_child) {
            self.next_sibling(new_child)
        } else {
            anchor
        };
        self.remove_child(parent, old_child)?;
        self.insert_before(parent, new_child, anchor)?;
        Ok(old_child)
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let data = match &self.get(node).ok_or(DomError::NotFound(node))?.data {
            NodeData::Element(e) => NodeData::Element(e.clone_shallow()),
            NodeData::Text(t) => NodeData::Text(t.clone()),
            NodeData::Comment(c) => NodeData::Comment(c.clone()),
            NodeData::Doctype { name } => NodeData::Doctype { name: name.clone() },
            NodeData::Document => return Err(DomError::InvalidNodeType),
        };
        let copy = self.push(Node::new(data));
        if deep {
            for child in self.child_ids(node) {
                let child_copy = self.clone_node(child, true)?;
                self.append_child(copy, child_copy)?;
            }
        }
        Ok(copy)
    }
}
