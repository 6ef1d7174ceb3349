//! HTML serialization (innerHTML / outerHTML)

use crate::{DomTree, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl DomTree {
    /// Serialized children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for (child, _) in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialized `id` including its own tag
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.data {
            NodeData::Document => {
                for (child, _) in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeData::Doctype { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Text(text) => {
                let raw = self
                    .parent(id)
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                if raw {
                    out.push_str(text);
                } else {
                    escape_into(text, false, out);
                }
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for attr in element.attrs.iter() {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    escape_into(&attr.value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    return;
                }
                for (child, _) in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DomTree, NodeOperations};

    #[test]
    fn test_serialize_nested() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        let br = tree.create_element("br");
        let text = tree.create_text("a < b & \"c\"");
        tree.append_child(tree.root(), ul).unwrap();
        tree.append_child(ul, li).unwrap();
        tree.append_child(li, text).unwrap();
        tree.append_child(li, br).unwrap();
        tree.set_attribute(li, "title", "say \"hi\"").unwrap();
        assert_eq!(
            tree.outer_html(ul),
            "<ul><li title=\"say &quot;hi&quot;\">a &lt; b &amp; \"c\"<br></li></ul>"
        );
        assert_eq!(tree.inner_html(li), "a &lt; b &amp; \"c\"<br>");
    }
}
