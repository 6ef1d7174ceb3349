//! domk HTML - HTML5 Parser
//!
//! Builds [`domk_dom::Document`] trees with html5ever, and parses markup
//! fragments into existing elements (innerHTML).

mod parser;

pub use domk_dom::{Document, DomTree, NodeId};
pub use parser::{HtmlParser, ParseError};

/// Parse a complete HTML document
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse `html` and append the resulting nodes to `parent`
pub fn parse_fragment_into(
    tree: &mut DomTree,
    parent: NodeId,
    html: &str,
) -> Result<Vec<NodeId>, ParseError> {
    HtmlParser::new().parse_fragment_into(tree, parent, html)
}
