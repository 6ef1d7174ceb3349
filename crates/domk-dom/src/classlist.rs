//! DOMTokenList (classList)
//!
//! Space-separated token set backing the `class` attribute.

/// DOMTokenList for managing space-separated tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DOMTokenList {
    tokens: Vec<String>,
}

impl DOMTokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from space-separated string, dropping duplicates
    pub fn from_string(s: &str) -> Self {
        let mut list = Self::new();
        for token in s.split_whitespace() {
            list.add(token);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Add a token, returns true if it was absent
    pub fn add(&mut self, token: &str) -> bool {
        if token.is_empty() || self.contains(token) {
            return false;
        }
        self.tokens.push(token.to_string());
        true
    }

    /// Remove a token, returns true if it was present
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        before != self.tokens.len()
    }

    /// Toggle token, returns new state
    pub fn toggle(&mut self, token: &str, force: Option<bool>) -> bool {
        let on = force.unwrap_or(!self.contains(token));
        if on {
            self.add(token);
        } else {
            self.remove(token);
        }
        on
    }

    /// Serialized attribute value
    pub fn value(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|s| s.as_str())
    }
}

impl std::fmt::Display for DOMTokenList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        let list = DOMTokenList::from_string("btn  btn-primary active btn");
        assert_eq!(list.len(), 3);
        assert!(list.contains("btn-primary"));
        assert_eq!(list.value(), "btn btn-primary active");
    }

    #[test]
    fn test_toggle() {
        let mut list = DOMTokenList::new();
        assert!(list.toggle("active", None));
        assert!(!list.toggle("active", None));
        assert!(list.toggle("active", Some(true)));
        assert!(list.toggle("active", Some(true)));
        assert_eq!(list.len(), 1);
        assert!(!list.toggle("active", Some(false)));
        assert!(list.is_empty());
    }
}
