//! DOM Node
//!
//! Nodes link to each other through [`NodeId`] indices instead of pointers.

use std::collections::HashMap;

use crate::{Listener, NamedNodeMap, NodeId, Value};

/// DOM Node - links plus payload
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub parent: NodeId,
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
    /// Tenancy stamp of the arena slot
    pub(crate) stamp: u32,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
            stamp: 0,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this node may hold children
    pub fn is_container(&self) -> bool {
        matches!(self.data, NodeData::Document | NodeData::Element(_))
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    Doctype {
        name: String,
    },
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Lower-case tag name
    pub name: String,
    pub attrs: NamedNodeMap,
    /// Script-visible properties (`checked`, `value`, ...)
    pub properties: HashMap<String, Value>,
    /// `on<event>` handler slots, one listener per event name
    pub handlers: HashMap<String, Listener>,
    /// Additive listeners in registration order
    pub listeners: Vec<(String, Listener)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: NamedNodeMap::new(),
            properties: HashMap::new(),
            handlers: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Copy for `cloneNode`: attributes and properties, never listeners
    pub(crate) fn clone_shallow(&self) -> Self {
        Self {
            name: self.name.clone(),
            attrs: self.attrs.clone(),
            properties: self.properties.clone(),
            handlers: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id")
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == token))
    }
}
