//! Error types

use domk_css::SelectorError;
use domk_dom::DomError;
use domk_html::ParseError;

/// Errors surfaced by fallible host operations
#[derive(Debug, thiserror::Error)]
pub enum DomkError {
    #[error("HTML parse error: {0}")]
    Html(#[from] ParseError),
    #[error("invalid selector `{selector}`: {source}")]
    Selector {
        selector: String,
        #[source]
        source: SelectorError,
    },
    #[error("DOM operation failed: {0}")]
    Dom(#[from] DomError),
}

pub type Result<T, E = DomkError> = std::result::Result<T, E>;
