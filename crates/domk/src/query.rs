//! Selector cache
//!
//! Remembers the most recent `(container, selector, all)` lookup. Entries
//! are tagged with the tree's mutation generation and are also dropped
//! explicitly after every engine write. Parsed selectors are memoized by
//! their text.

use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::Rc;

use domk_css::{SelectorError, SelectorList};
use domk_dom::NodeId;

/// Selector meaning "the container itself"
pub const THIS: &str = "this";

struct LastQuery {
    container: NodeId,
    selector: String,
    all: bool,
    generation: u64,
    result: Vec<NodeId>,
}

#[derive(Default)]
pub(crate) struct SelectorCache {
    last: Option<LastQuery>,
    parsed: HashMap<String, Rc<SelectorList>>,
}

impl SelectorCache {
    /// Cached result for the exact triple, if still valid at `generation`
    pub(crate) fn lookup(&self, container: NodeId, selector: &str, all: bool, generation: u64) -> Option<Vec<NodeId>> {
        self.last
            .as_ref()
            .filter(|q| {
                q.container == container && q.all == all && q.generation == generation && q.selector == selector
            })
            .map(|q| q.result.clone())
    }

    pub(crate) fn store(&mut self, container: NodeId, selector: &str, all: bool, generation: u64, result: &[NodeId]) {
        self.last = Some(LastQuery {
            container,
            selector: selector.to_string(),
            all,
            generation,
            result: result.to_vec(),
        });
    }

    pub(crate) fn invalidate(&mut self) {
        self.last = None;
    }

    pub(crate) fn parse(&mut self, selector: &str) -> Result<Rc<SelectorList>, SelectorError> {
        if let Some(list) = self.parsed.get(selector) {
            return Ok(list.clone());
        }
        let list = Rc::new(SelectorList::parse(&scoped(selector))?);
        self.parsed.insert(selector.to_string(), list.clone());
        Ok(list)
    }
}

/// Anchor a leading child combinator to the container
pub(crate) fn scoped(selector: &str) -> Cow<'_, str> {
    let trimmed = selector.trim_start();
    if trimmed.starts_with('>') {
        Cow::Owned(format!(":scope {trimmed}"))
    } else {
        Cow::Borrowed(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_rewrites_leading_child_combinator() {
        assert_eq!(scoped("> li"), ":scope > li");
        assert_eq!(scoped("  >span"), ":scope >span");
        assert_eq!(scoped("ul > li"), "ul > li");
    }

    #[test]
    fn test_lookup_requires_exact_triple_and_generation() {
        let mut cache = SelectorCache::default();
        let hit = vec![NodeId::ROOT];
        cache.store(NodeId::ROOT, "h1", false, 3, &hit);
        assert_eq!(cache.lookup(NodeId::ROOT, "h1", false, 3), Some(hit));
        assert!(cache.lookup(NodeId::ROOT, "h1", true, 3).is_none());
        assert!(cache.lookup(NodeId::ROOT, "h2", false, 3).is_none());
        assert!(cache.lookup(NodeId::ROOT, "h1", false, 4).is_none());
        cache.invalidate();
        assert!(cache.lookup(NodeId::ROOT, "h1", false, 3).is_none());
    }

    #[test]
    fn test_parse_memoizes() {
        let mut cache = SelectorCache::default();
        let a = cache.parse(">li").unwrap();
        let b = cache.parse(">li").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(cache.parse("li[").is_err());
    }
}
