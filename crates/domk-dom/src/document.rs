//! Document - High-level document API

use crate::{DomTree, NodeId, NodeOperations};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    url: String,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a document with an empty `html`/`head`/`body` skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        let structure = [(tree.root(), html), (html, head), (html, body)];
        for (parent, child) in structure {
            // Fresh nodes under a fresh root cannot violate the hierarchy
            if let Err(err) = tree.append_child(parent, child) {
                tracing::warn!("document skeleton: {err}");
            }
        }

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
        }
    }

    /// Locate `html`, `head` and `body` after the tree was built externally
    pub fn finalize(&mut self) {
        let html = self
            .tree
            .element_children(self.tree.root())
            .into_iter()
            .find(|&id| self.tree.tag_name(id) == Some("html"));
        self.html_element = html.unwrap_or(NodeId::NONE);
        self.head_element = NodeId::NONE;
        self.body_element = NodeId::NONE;
        if let Some(html) = html {
            for child in self.tree.element_children(html) {
                match self.tree.tag_name(child) {
                    Some("head") if !self.head_element.is_valid() => self.head_element = child,
                    Some("body") if !self.body_element.is_valid() => self.body_element = child,
                    _ => {}
                }
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Text of the first `<title>` in `<head>`
    pub fn title(&self) -> String {
        let Some(head) = self.head() else {
            return String::new();
        };
        self.tree
            .element_children(head)
            .into_iter()
            .find(|&id| self.tree.tag_name(id) == Some("title"))
            .map(|title| self.tree.text_content(title))
            .unwrap_or_default()
    }

    /// Get <html> element
    pub fn document_element(&self) -> Option<NodeId> {
        self.html_element.link()
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head_element.link()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body_element.link()
    }

    /// First connected element whose `id` attribute equals `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|&node| self.tree.element(node).and_then(|e| e.id()) == Some(id))
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton() {
        let doc = Document::new("about:blank");
        let body = doc.body().unwrap();
        assert_eq!(doc.tree().tag_name(body), Some("body"));
        assert_eq!(doc.tree().parent(body), doc.document_element());
    }

    #[test]
    fn test_finalize_and_lookup() {
        let mut doc = Document::empty("about:blank");
        let tree = doc.tree_mut();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        let div = tree.create_element("div");
        tree.append_child(NodeId::ROOT, html).unwrap();
        tree.append_child(html, body).unwrap();
        tree.append_child(body, div).unwrap();
        tree.set_attribute(div, "id", "app").unwrap();
        doc.finalize();
        assert_eq!(doc.body(), Some(body));
        assert_eq!(doc.head(), None);
        assert_eq!(doc.get_element_by_id("app"), Some(div));
        assert_eq!(doc.get_element_by_id("missing"), None);
    }
}
