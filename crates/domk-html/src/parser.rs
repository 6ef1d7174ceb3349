//! HTML5 Parser implementation
//!
//! Parses with html5ever into its RcDom, then copies the result into the
//! arena tree. Whitespace-only text nodes are dropped on the way.

use domk_dom::{Document, DomError, DomTree, NodeId, NodeOperations};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

/// HTML parse failures
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build tree: {0}")]
    Dom(#[from] DomError),
}

/// HTML5 parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);
        let dom = self.read(html)?;

        let mut document = Document::empty(url);
        self.convert_node(&dom.document, document.tree_mut(), NodeId::ROOT)?;
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse a fragment and append its top-level nodes to `parent`.
    /// Returns the appended nodes in order.
    pub fn parse_fragment_into(
        &self,
        tree: &mut DomTree,
        parent: NodeId,
        html: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        let dom = self.read(html)?;
        let mut added = Vec::new();
        let Some(root) = find_child(&dom.document, "html") else {
            return Ok(added);
        };
        // Metadata content such as <style> lands in head, the rest in body
        for section in ["head", "body"] {
            let Some(section) = find_child(&root, section) else { continue };
            for child in section.children.borrow().iter() {
                if let Some(id) = self.convert_node(child, tree, parent)? {
                    added.push(id);
                }
            }
        }
        tracing::trace!("Parsed fragment into {} ({} top-level nodes)", parent, added.len());
        Ok(added)
    }

    fn read(&self, html: &str) -> Result<RcDom, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    /// Convert an RcDom node (and its subtree) under `parent`
    fn convert_node(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: NodeId,
    ) -> Result<Option<NodeId>, ParseError> {
        let id = match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent)?;
                }
                return Ok(None);
            }
            RcNodeData::Doctype { name, .. } => tree.create_doctype(&name.to_string()),
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    return Ok(None);
                }
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(&contents.to_string()),
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let id = tree.create_element(&*name.local);
                for attr in attrs.borrow().iter() {
                    tree.set_attribute(id, &attr.name.local, &attr.value)?;
                }
                tree.append_child(parent, id)?;
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id)?;
                }
                if let Some(contents) = template_contents.borrow().as_ref() {
                    for child in contents.children.borrow().iter() {
                        self.convert_node(child, tree, id)?;
                    }
                }
                return Ok(Some(id));
            }
            RcNodeData::ProcessingInstruction { .. } => return Ok(None),
        };
        tree.append_child(parent, id)?;
        Ok(Some(id))
    }
}

fn find_child(handle: &Handle, tag: &str) -> Option<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .find(|child| matches!(&child.data, RcNodeData::Element { name, .. } if &*name.local == tag))
        .cloned()
}
