//! Element Attributes
//!
//! Ordered attribute collection with by-name lookup.

use std::collections::HashMap;

/// Named node map (attribute collection), insertion ordered
#[derive(Debug, Clone, Default)]
pub struct NamedNodeMap {
    attributes: Vec<Attr>,
    by_name: HashMap<String, usize>,
}

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl NamedNodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Get attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .and_then(|&i| self.attributes.get(i))
            .map(|a| a.value.as_str())
    }

    /// Set attribute, returns true when the stored value changed
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        if let Some(&index) = self.by_name.get(name) {
            let attr = &mut self.attributes[index];
            if attr.value == value {
                return false;
            }
            attr.value = value.to_string();
        } else {
            self.by_name.insert(name.to_string(), self.attributes.len());
            self.attributes.push(Attr::new(name, value));
        }
        true
    }

    /// Remove attribute by name
    pub fn remove(&mut self, name: &str) -> Option<Attr> {
        let index = self.by_name.remove(name)?;
        for idx in self.by_name.values_mut() {
            if *idx > index {
                *idx -= 1;
            }
        }
        Some(self.attributes.remove(index))
    }

    /// Check if attribute exists
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate over attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_attribute() {
        let mut attrs = NamedNodeMap::new();
        assert!(attrs.set("id", "main"));
        assert!(!attrs.set("id", "main"));
        assert_eq!(attrs.get("id"), Some("main"));
        assert!(attrs.contains("id"));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut attrs = NamedNodeMap::new();
        attrs.set("a", "1");
        attrs.set("b", "2");
        attrs.set("c", "3");
        attrs.remove("a");
        assert_eq!(attrs.get("c"), Some("3"));
        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
    }
}
