//! CSS Selectors
//!
//! Selector list parsing and right-to-left matching against a `DomTree`.
//! Matching is relative to a scope node: `:scope` matches it, and the
//! query helpers only return descendants of it, while ancestors used by
//! combinators may lie outside.

use std::str::FromStr;

use domk_dom::{DomTree, NodeId};

/// Selector parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected `{ch}` at offset {offset}")]
    Unexpected { ch: char, offset: usize },
    #[error("unexpected end of selector")]
    UnexpectedEnd,
    #[error("unsupported pseudo-class `:{0}`")]
    UnsupportedPseudo(String),
    #[error("invalid An+B expression `{0}`")]
    InvalidNth(String),
}

/// Comma-separated list of complex selectors
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, stored left to right
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    pub combinators: Vec<Combinator>,
}

/// Simple selectors that must all match the same element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound(pub Vec<SelectorComponent>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// A component of a selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (tag name, lower-cased)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    PseudoClass(PseudoClass),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Scope,
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    NthOfType(NthExpression),
    NthLastOfType(NthExpression),
    Not(Box<SelectorList>),
    Checked,
    Disabled,
    Enabled,
}

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone, PartialEq)]
pub struct NthExpression {
    /// Coefficient (A in An+B)
    pub a: i32,
    /// Offset (B in An+B)
    pub b: i32,
}

impl NthExpression {
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// A simple index (0n+b)
    pub fn index(n: i32) -> Self {
        Self { a: 0, b: n }
    }

    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Parse from string like "2n+1", "odd", "even", "3"
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.split_whitespace().collect::<String>().to_ascii_lowercase();
        match s.as_str() {
            "odd" => return Some(Self::odd()),
            "even" => return Some(Self::even()),
            _ => {}
        }
        if let Ok(n) = s.parse::<i32>() {
            return Some(Self::index(n));
        }
        let (a_str, rest) = s.split_once('n')?;
        let a = match a_str {
            "" | "+" => 1,
            "-" => -1,
            _ => a_str.parse().ok()?,
        };
        let b = if rest.is_empty() { 0 } else { rest.parse().ok()? };
        Some(Self::new(a, b))
    }

    /// Check if index n (1-based) matches this expression
    pub fn matches(&self, n: i32) -> bool {
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        if self.a > 0 {
            diff >= 0 && diff % self.a == 0
        } else {
            diff <= 0 && diff % self.a == 0
        }
    }
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(value)) = (&self.matcher, value) else {
            return self.matcher.is_none() && value.is_some();
        };
        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let value = fold(value);
        match matcher {
            AttributeMatcher::Exact(expected) => value == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                value.split_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                value == expected || value.starts_with(&format!("{expected}-"))
            }
            // Empty operands never match for the substring family
            AttributeMatcher::Prefix(expected) => {
                !expected.is_empty() && value.starts_with(&fold(expected))
            }
            AttributeMatcher::Suffix(expected) => {
                !expected.is_empty() && value.ends_with(&fold(expected))
            }
            AttributeMatcher::Substring(expected) => {
                !expected.is_empty() && value.contains(&fold(expected))
            }
        }
    }
}

// ============================================================================
// Matching
// ============================================================================

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(input);
        let list = parser.parse_list()?;
        match parser.peek() {
            None => {
                tracing::trace!("Parsed selector {:?} ({} complex)", input, list.0.len());
                Ok(list)
            }
            Some(ch) => Err(SelectorError::Unexpected { ch, offset: parser.pos }),
        }
    }

    /// Whether `element` matches any selector in the list
    pub fn matches(&self, tree: &DomTree, element: NodeId, scope: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(tree, element, scope))
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl ComplexSelector {
    pub fn matches(&self, tree: &DomTree, element: NodeId, scope: NodeId) -> bool {
        match self.compounds.len().checked_sub(1) {
            Some(last) => self.match_at(tree, last, element, scope),
            None => false,
        }
    }

    fn match_at(&self, tree: &DomTree, index: usize, node: NodeId, scope: NodeId) -> bool {
        if !self.compounds[index].matches(tree, node, scope) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let next = index - 1;
        match self.combinators[next] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|parent| self.match_at(tree, next, parent, scope)),
            Combinator::Descendant => {
                let mut cur = tree.parent(node);
                while let Some(ancestor) = cur {
                    if self.match_at(tree, next, ancestor, scope) {
                        return true;
                    }
                    cur = tree.parent(ancestor);
                }
                false
            }
            Combinator::NextSibling => tree
                .prev_element_sibling(node)
                .is_some_and(|sibling| self.match_at(tree, next, sibling, scope)),
            Combinator::SubsequentSibling => {
                let mut cur = tree.prev_element_sibling(node);
                while let Some(sibling) = cur {
                    if self.match_at(tree, next, sibling, scope) {
                        return true;
                    }
                    cur = tree.prev_element_sibling(sibling);
                }
                false
            }
        }
    }
}

impl Compound {
    pub fn matches(&self, tree: &DomTree, node: NodeId, scope: NodeId) -> bool {
        if !tree.is_element(node) {
            // Only a bare `:scope` can match a non-element scope (the document)
            return node == scope
                && !self.0.is_empty()
                && self
                    .0
                    .iter()
                    .all(|c| matches!(c, SelectorComponent::PseudoClass(PseudoClass::Scope)));
        }
        self.0.iter().all(|c| c.matches(tree, node, scope))
    }
}

impl SelectorComponent {
    fn matches(&self, tree: &DomTree, node: NodeId, scope: NodeId) -> bool {
        let Some(element) = tree.element(node) else {
            return false;
        };
        match self {
            SelectorComponent::Universal => true,
            SelectorComponent::Type(name) => element.name == *name,
            SelectorComponent::Id(id) => element.id() == Some(id.as_str()),
            SelectorComponent::Class(class) => element.has_class(class),
            SelectorComponent::Attribute(attr) => attr.matches(element.get_attr(&attr.name)),
            SelectorComponent::PseudoClass(pseudo) => pseudo.matches(tree, node, scope),
        }
    }
}

impl PseudoClass {
    fn matches(&self, tree: &DomTree, node: NodeId, scope: NodeId) -> bool {
        match self {
            PseudoClass::Scope => node == scope,
            PseudoClass::Root => tree.parent(node) == Some(tree.root()),
            PseudoClass::Empty => tree
                .children(node)
                .all(|(_, child)| !child.is_element() && child.as_text().is_none_or(str::is_empty)),
            PseudoClass::FirstChild => tree.prev_element_sibling(node).is_none(),
            PseudoClass::LastChild => tree.next_element_sibling(node).is_none(),
            PseudoClass::OnlyChild => {
                tree.prev_element_sibling(node).is_none() && tree.next_element_sibling(node).is_none()
            }
            PseudoClass::FirstOfType => position(tree, node, false, true) == 1,
            PseudoClass::LastOfType => position(tree, node, true, true) == 1,
            PseudoClass::NthChild(expr) => expr.matches(position(tree, node, false, false)),
            PseudoClass::NthLastChild(expr) => expr.matches(position(tree, node, true, false)),
            PseudoClass::NthOfType(expr) => expr.matches(position(tree, node, false, true)),
            PseudoClass::NthLastOfType(expr) => expr.matches(position(tree, node, true, true)),
            PseudoClass::Not(list) => !list.matches(tree, node, scope),
            PseudoClass::Checked => {
                let property = if tree.tag_name(node) == Some("option") { "selected" } else { "checked" };
                tree.property(node, property).is_truthy()
            }
            PseudoClass::Disabled => tree.property(node, "disabled").is_truthy(),
            PseudoClass::Enabled => !tree.property(node, "disabled").is_truthy(),
        }
    }
}

/// 1-based index among element siblings, optionally of the same type
fn position(tree: &DomTree, node: NodeId, from_end: bool, same_type: bool) -> i32 {
    let tag = tree.tag_name(node);
    let step = |id| {
        if from_end {
            tree.next_element_sibling(id)
        } else {
            tree.prev_element_sibling(id)
        }
    };
    let mut index = 1;
    let mut cur = step(node);
    while let Some(sibling) = cur {
        if !same_type || tree.tag_name(sibling) == tag {
            index += 1;
        }
        cur = step(sibling);
    }
    index
}

// ============================================================================
// Queries
// ============================================================================

/// All descendants of `root` matching `selectors`, in document order
pub fn query_selector_all(tree: &DomTree, root: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
    tree.descendants(root)
        .into_iter()
        .filter(|&node| tree.is_element(node) && selectors.matches(tree, node, root))
        .collect()
}

/// First descendant of `root` matching `selectors`
pub fn query_selector(tree: &DomTree, root: NodeId, selectors: &SelectorList) -> Option<NodeId> {
    tree.descendants(root)
        .into_iter()
        .find(|&node| tree.is_element(node) && selectors.matches(tree, node, root))
}

// ============================================================================
// Parsing
// ============================================================================

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Skip whitespace, returns true if any was skipped
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::Unexpected { ch, offset: self.pos },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Err(if selectors.is_empty() {
                    SelectorError::Empty
                } else {
                    SelectorError::UnexpectedEnd
                });
            }
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            if self.peek() != Some(',') {
                return Ok(SelectorList(selectors));
            }
            self.pos += 1;
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector { compounds, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut components = Vec::new();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                components.push(SelectorComponent::Universal);
            }
            Some(c) if is_ident_start(c) => {
                let name = self.parse_ident()?;
                components.push(SelectorComponent::Type(name.to_ascii_lowercase()));
            }
            _ => {}
        }
        loop {
            let component = match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    SelectorComponent::Id(self.parse_ident()?)
                }
                Some('.') => {
                    self.pos += 1;
                    SelectorComponent::Class(self.parse_ident()?)
                }
                Some('[') => {
                    self.pos += 1;
                    SelectorComponent::Attribute(self.parse_attribute()?)
                }
                Some(':') => {
                    self.pos += 1;
                    SelectorComponent::PseudoClass(self.parse_pseudo()?)
                }
                _ => break,
            };
            components.push(component);
        }
        if components.is_empty() {
            return Err(self.unexpected());
        }
        Ok(Compound(components))
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                let escaped = self.peek().ok_or(SelectorError::UnexpectedEnd)?;
                ident.push(escaped);
                self.pos += 1;
            } else if is_ident_char(c) {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.unexpected());
        }
        Ok(ident)
    }

    fn parse_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            let c = self.peek().ok_or(SelectorError::UnexpectedEnd)?;
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek().ok_or(SelectorError::UnexpectedEnd)?;
                    value.push(escaped);
                    self.pos += 1;
                }
                c if c == quote => return Ok(value),
                c => value.push(c),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    matcher: None,
                    case_insensitive: false,
                });
            }
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                c
            }
            _ => return Err(self.unexpected()),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(quote)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        let mut case_insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.pos += 1;
            self.skip_whitespace();
        }
        self.expect(']')?;
        let matcher = match op {
            '=' => AttributeMatcher::Exact(value),
            '~' => AttributeMatcher::Contains(value),
            '|' => AttributeMatcher::DashMatch(value),
            '^' => AttributeMatcher::Prefix(value),
            '$' => AttributeMatcher::Suffix(value),
            _ => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector {
            name,
            matcher: Some(matcher),
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<PseudoClass, SelectorError> {
        if self.peek() == Some(':') {
            self.pos += 1;
            let name = self.parse_ident()?;
            return Err(SelectorError::UnsupportedPseudo(format!(":{name}")));
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        if self.peek() != Some('(') {
            return match name.as_str() {
                "scope" => Ok(PseudoClass::Scope),
                "root" => Ok(PseudoClass::Root),
                "empty" => Ok(PseudoClass::Empty),
                "first-child" => Ok(PseudoClass::FirstChild),
                "last-child" => Ok(PseudoClass::LastChild),
                "only-child" => Ok(PseudoClass::OnlyChild),
                "first-of-type" => Ok(PseudoClass::FirstOfType),
                "last-of-type" => Ok(PseudoClass::LastOfType),
                "checked" => Ok(PseudoClass::Checked),
                "disabled" => Ok(PseudoClass::Disabled),
                "enabled" => Ok(PseudoClass::Enabled),
                _ => Err(SelectorError::UnsupportedPseudo(name)),
            };
        }
        self.pos += 1;
        let pseudo = match name.as_str() {
            "not" => PseudoClass::Not(Box::new(self.parse_list()?)),
            "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                let mut raw = String::new();
                while let Some(c) = self.peek().filter(|&c| c != ')') {
                    raw.push(c);
                    self.pos += 1;
                }
                let expr = NthExpression::parse(&raw).ok_or(SelectorError::InvalidNth(raw))?;
                match name.as_str() {
                    "nth-child" => PseudoClass::NthChild(expr),
                    "nth-last-child" => PseudoClass::NthLastChild(expr),
                    "nth-of-type" => PseudoClass::NthOfType(expr),
                    _ => PseudoClass::NthLastOfType(expr),
                }
            }
            _ => return Err(SelectorError::UnsupportedPseudo(name)),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(pseudo)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nth_expression_odd() {
        let expr = NthExpression::odd();
        assert!(expr.matches(1));
        assert!(!expr.matches(2));
        assert!(expr.matches(3));
    }

    #[test]
    fn test_nth_expression_parse() {
        assert_eq!(NthExpression::parse("odd"), Some(NthExpression::odd()));
        assert_eq!(NthExpression::parse("3"), Some(NthExpression::index(3)));
        assert_eq!(NthExpression::parse("2n + 1"), Some(NthExpression::new(2, 1)));
        assert_eq!(NthExpression::parse("-n+3"), Some(NthExpression::new(-1, 3)));
        assert_eq!(NthExpression::parse("x"), None);
    }

    #[test]
    fn test_parse_compound_and_combinators() {
        let list = SelectorList::parse("ul.todo > li:not(.done) + li, #app [data-id^=\"a\" i]").unwrap();
        assert_eq!(list.0.len(), 2);
        let first = &list.0[0];
        assert_eq!(first.compounds.len(), 3);
        assert_eq!(first.combinators, vec![Combinator::Child, Combinator::NextSibling]);
        assert_eq!(
            first.compounds[0].0,
            vec![SelectorComponent::Type("ul".into()), SelectorComponent::Class("todo".into())]
        );
        let second = &list.0[1];
        assert_eq!(second.combinators, vec![Combinator::Descendant]);
        let SelectorComponent::Attribute(attr) = &second.compounds[1].0[0] else {
            panic!("expected attribute selector");
        };
        assert!(attr.case_insensitive);
        assert_eq!(attr.matcher, Some(AttributeMatcher::Prefix("a".into())));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SelectorList::parse(""), Err(SelectorError::Empty));
        assert_eq!(SelectorList::parse("   "), Err(SelectorError::Empty));
        assert_eq!(SelectorList::parse("a,"), Err(SelectorError::UnexpectedEnd));
        assert!(matches!(SelectorList::parse("> a"), Err(SelectorError::Unexpected { ch: '>', .. })));
        assert!(matches!(SelectorList::parse("a:hover"), Err(SelectorError::UnsupportedPseudo(_))));
        assert!(matches!(SelectorList::parse("a::before"), Err(SelectorError::UnsupportedPseudo(_))));
        assert!(matches!(SelectorList::parse("li:nth-child(x)"), Err(SelectorError::InvalidNth(_))));
        assert!(SelectorList::parse("[href").is_err());
    }

    #[test]
    fn test_attribute_matching() {
        let exists = AttributeSelector { name: "href".into(), matcher: None, case_insensitive: false };
        assert!(exists.matches(Some("")));
        assert!(!exists.matches(None));
        let dash = AttributeSelector {
            name: "lang".into(),
            matcher: Some(AttributeMatcher::DashMatch("en".into())),
            case_insensitive: false,
        };
        assert!(dash.matches(Some("en-US")));
        assert!(!dash.matches(Some("english")));
    }
}
