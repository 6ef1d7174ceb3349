//! Inline style declarations
//!
//! Parses and serializes the `style` attribute as an ordered list of
//! `property: value` pairs.

/// Inline style declaration block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    declarations: Vec<(String, String)>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a: b; c: d` text. Malformed entries are skipped.
    pub fn parse(text: &str) -> Self {
        let mut decl = Self::new();
        for entry in text.split(';') {
            let Some((name, value)) = entry.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() && !value.is_empty() {
                decl.set_property(name, value);
            }
        }
        decl
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        self.declarations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property; an empty value removes it
    pub fn set_property(&mut self, name: &str, value: &str) {
        let name = normalize_name(name);
        let value = value.trim();
        if value.is_empty() {
            self.remove_property(&name);
            return;
        }
        match self.declarations.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        let name = normalize_name(name);
        let index = self.declarations.iter().position(|(n, _)| *n == name)?;
        Some(self.declarations.remove(index).1)
    }

    /// Serialized form, e.g. `color: red; width: 10px;`
    pub fn css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(n, v)| format!("{n}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Accepts camelCase names (`backgroundColor`) as well as CSS names
fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let decl = StyleDeclaration::parse("color: red;; width:10px ; bogus");
        assert_eq!(decl.len(), 2);
        assert_eq!(decl.css_text(), "color: red; width: 10px;");
    }

    #[test]
    fn test_camel_case_names() {
        let mut decl = StyleDeclaration::new();
        decl.set_property("backgroundColor", "blue");
        assert_eq!(decl.get_property_value("background-color"), Some("blue"));
        decl.set_property("background-color", "");
        assert!(decl.is_empty());
    }
}
