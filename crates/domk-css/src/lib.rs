//! domk CSS - Selector engine
//!
//! Parses selector lists and evaluates them against a [`domk_dom::DomTree`].
//! Supports type, universal, id, class and attribute selectors, the four
//! combinators, and the structural pseudo-classes used by templates
//! (`:scope`, `:first-child`, `:nth-child()`, `:not()`, ...).

pub mod selectors;

pub use selectors::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexSelector, Compound, NthExpression,
    PseudoClass, SelectorComponent, SelectorError, SelectorList, query_selector,
    query_selector_all,
};
