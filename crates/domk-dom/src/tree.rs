//! DOM Tree (arena-based allocation)
//!
//! Owns every node of a document. Every structural or content write bumps
//! [`DomTree::generation`], which callers use to validate cached queries.
//! Slots of freed subtrees go on a free list and are handed out again with a
//! bumped stamp.

use crate::{
    DOMTokenList, DomError, DomResult, ElementData, Event, Listener, Node, NodeData, NodeId,
    NodeOperations, StyleDeclaration, Value,
};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    pub(crate) nodes: Vec<Node>,
    /// Indices of freed slots
    free: Vec<u32>,
    generation: u64,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            free: Vec::new(),
            generation: 0,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The node `id` names, unless its slot was freed since
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).filter(|node| node.stamp == id.stamp())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).filter(|node| node.stamp == id.stamp())
    }

    /// Number of live nodes (detached ones included)
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arena slots allocated so far, free ones included
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Mutation counter, bumped on every write
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub(crate) fn touch(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn push(&mut self, mut node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index as usize];
            node.stamp = slot.stamp;
            let id = NodeId::new(index, node.stamp);
            *slot = node;
            return id;
        }
        let id = NodeId::new(self.nodes.len() as u32, 0);
        self.nodes.push(node);
        id
    }

    /// Free a detached node and its whole subtree, returning how many slots
    /// went back on the free list. Attached nodes and the root are left alone.
    pub fn free_subtree(&mut self, id: NodeId) -> usize {
        if id == NodeId::ROOT || self.get(id).is_none_or(|node| node.parent.is_valid()) {
            return 0;
        }
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in &doomed {
            let slot = &mut self.nodes[node.index()];
            let stamp = slot.stamp.wrapping_add(1);
            *slot = Node::new(NodeData::Comment(String::new()));
            slot.stamp = stamp;
            self.free.push(node.index() as u32);
        }
        doomed.len()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::new(NodeData::Element(ElementData::new(tag))))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::new(NodeData::Text(text.to_string())))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::new(NodeData::Comment(text.to_string())))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(Node::new(NodeData::Doctype { name: name.to_string() }))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.link())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.link())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.link())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.link())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.link())
    }

    /// Iterate over `(id, node)` children in order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .filter(|(_, n)| n.is_element())
            .map(|(child, _)| child)
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).find(|(_, n)| n.is_element()).map(|(child, _)| child)
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(sibling) = cur {
            if self.is_element(sibling) {
                return Some(sibling);
            }
            cur = self.prev_sibling(sibling);
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(sibling) = cur {
            if self.is_element(sibling) {
                return Some(sibling);
            }
            cur = self.next_sibling(sibling);
        }
        None
    }

    /// All descendants of `id` in document (pre-)order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.first_child(id);
        while let Some(current) = next {
            out.push(current);
            next = self.first_child(current).or_else(|| {
                let mut cursor = current;
                loop {
                    if cursor == id {
                        return None;
                    }
                    if let Some(sibling) = self.next_sibling(cursor) {
                        return Some(sibling);
                    }
                    cursor = self.parent(cursor)?;
                    if cursor == id {
                        return None;
                    }
                }
            });
        }
        out
    }

    /// True if `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Whether `node` is attached under the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(NodeId::ROOT, node)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Unlink a node from its parent and siblings
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        let Some(parent) = parent.link() else { return };

        match prev.link() {
            Some(p) => self.nodes[p.index()].next_sibling = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next.link() {
            Some(n) => self.nodes[n.index()].prev_sibling = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }
        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
        self.touch();
    }

    /// Remove every child of `id`, returning the detached nodes
    pub fn clear_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let removed = self.child_ids(id);
        for &child in &removed {
            self.detach(child);
        }
        removed
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) | Some(NodeData::Comment(t)) => t.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|d| self.get(d).and_then(Node::as_text))
                .collect(),
            None => String::new(),
        }
    }

    /// Replace the content of `id` with a single text node.
    /// A sole text child is rewritten in place; otherwise returns the
    /// children that were detached.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<Vec<NodeId>> {
        if let Some(child) = self.sole_text_child(id) {
            if text.is_empty() {
                self.detach(child);
                return Ok(vec![child]);
            }
            if let Some(Node { data: NodeData::Text(t), .. }) = self.get_mut(child) {
                if t.as_str() != text {
                    *t = text.to_string();
                    self.touch();
                }
            }
            return Ok(Vec::new());
        }
        let node = self.get_mut(id).ok_or(DomError::NotFound(id))?;
        match &mut node.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                if t.as_str() != text {
                    *t = text.to_string();
                    self.touch();
                }
                return Ok(Vec::new());
            }
            NodeData::Doctype { .. } => return Err(DomError::InvalidNodeType),
            _ => {}
        }
        let removed = self.clear_children(id);
        if !text.is_empty() {
            let child = self.create_text(text);
            self.append_child(id, child)?;
        }
        self.touch();
        Ok(removed)
    }

    fn sole_text_child(&self, id: NodeId) -> Option<NodeId> {
        let child = self.first_child(id)?;
        (self.next_sibling(child).is_none() && self.get(child).is_some_and(Node::is_text)).then_some(child)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attrs.get(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.attrs.contains(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        if self.element_mut(id)?.attrs.set(&name.to_ascii_lowercase(), value) {
            self.touch();
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        if self.element_mut(id)?.attrs.remove(&name.to_ascii_lowercase()).is_some() {
            self.touch();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    pub fn class_list(&self, id: NodeId) -> DOMTokenList {
        DOMTokenList::from_string(self.get_attribute(id, "class").unwrap_or(""))
    }

    pub fn has_class(&self, id: NodeId, token: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(token))
    }

    /// Force `token` on or off, rewriting the attribute only when needed
    pub fn toggle_class(&mut self, id: NodeId, token: &str, on: bool) -> DomResult<()> {
        if self.has_class(id, token) == on {
            return Ok(());
        }
        let mut list = self.class_list(id);
        list.toggle(token, Some(on));
        self.set_attribute(id, "class", &list.value())
    }

    // ------------------------------------------------------------------
    // Inline style
    // ------------------------------------------------------------------

    pub fn style(&self, id: NodeId) -> StyleDeclaration {
        StyleDeclaration::parse(self.get_attribute(id, "style").unwrap_or(""))
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let mut style = self.style(id);
        style.set_property(name, value);
        self.set_attribute(id, "style", &style.css_text())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Script property. `checked`, `selected` and `disabled` fall back to the
    /// presence of the matching attribute until first written.
    pub fn property(&self, id: NodeId, name: &str) -> Value {
        let Some(element) = self.element(id) else {
            return Value::Null;
        };
        if let Some(value) = element.properties.get(name) {
            return value.clone();
        }
        match name {
            "checked" | "selected" | "disabled" => Value::Bool(element.attrs.contains(name)),
            "value" => element.attrs.get("value").map_or(Value::Null, Value::from),
            _ => Value::Null,
        }
    }

    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) -> DomResult<()> {
        let element = self.element_mut(id)?;
        if element.properties.get(name) != Some(&value) {
            element.properties.insert(name.to_string(), value);
            self.touch();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event listeners
    // ------------------------------------------------------------------

    /// Set (or clear) the single `on<event>` handler slot
    pub fn set_handler(&mut self, id: NodeId, event: &str, handler: Option<Listener>) -> DomResult<()> {
        let element = self.element_mut(id)?;
        match handler {
            Some(h) => element.handlers.insert(event.to_string(), h),
            None => element.handlers.remove(event),
        };
        self.touch();
        Ok(())
    }

    pub fn add_listener(&mut self, id: NodeId, event: &str, listener: Listener) -> DomResult<()> {
        let element = self.element_mut(id)?;
        if !element.listeners.iter().any(|(e, l)| e == event && l.ptr_eq(&listener)) {
            element.listeners.push((event.to_string(), listener));
            self.touch();
        }
        Ok(())
    }

    pub fn remove_listener(&mut self, id: NodeId, event: &str, listener: &Listener) -> DomResult<bool> {
        let element = self.element_mut(id)?;
        let before = element.listeners.len();
        element.listeners.retain(|(e, l)| !(e == event && l.ptr_eq(listener)));
        let removed = before != element.listeners.len();
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Listeners for `event` on `id`: handler slot first, then additive ones
    pub fn listeners(&self, id: NodeId, event: &str) -> Vec<Listener> {
        let Some(element) = self.element(id) else {
            return Vec::new();
        };
        element
            .handlers
            .get(event)
            .cloned()
            .into_iter()
            .chain(
                element
                    .listeners
                    .iter()
                    .filter(|(e, _)| e == event)
                    .map(|(_, l)| l.clone()),
            )
            .collect()
    }

    /// Propagation path for `event`: target first, then its ancestors
    pub fn event_path(&self, event: &Event) -> Vec<NodeId> {
        if !event.bubbles() {
            return vec![event.target()];
        }
        let mut path = Vec::new();
        let mut cur = Some(event.target());
        while let Some(id) = cur {
            path.push(id);
            cur = self.parent(id);
        }
        path
    }

    /// Pre-dispatch activation behavior (checkbox and radio clicks)
    pub fn activate(&mut self, id: NodeId, event: &str) -> DomResult<()> {
        if event != "click" || self.tag_name(id) != Some("input") {
            return Ok(());
        }
        let kind = self.get_attribute(id, "type").unwrap_or("text").to_ascii_lowercase();
        match kind.as_str() {
            "checkbox" => {
                let checked = self.property(id, "checked").is_truthy();
                self.set_property(id, "checked", Value::Bool(!checked))
            }
            "radio" => self.set_property(id, "checked", Value::Bool(true)),
            _ => Ok(()),
        }
    }
}

/// Iterator over children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling.link();
        Some((id, node))
    }
}
