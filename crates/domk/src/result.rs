//! Binding results
//!
//! A [`BindingResult`] describes the desired state of one node. Every
//! field is optional; fields left unset are not touched by the updater.

use std::fmt;
use std::rc::Rc;

use domk_dom::{Event, Listener, NodeId};

use crate::children::ChildrenSpec;
use crate::context::Context;
use crate::dynamic::ValueSource;

/// Keys routed to attributes without an `attr` wrapper
pub const ATTRIBUTE_SHORTHANDS: [&str; 4] = ["id", "href", "title", "name"];

/// Keys routed to properties without a `prop` wrapper
pub const PROPERTY_SHORTHANDS: [&str; 4] = ["selected", "disabled", "checked", "value"];

/// `class` binding value
#[derive(Debug, Clone)]
pub enum ClassValue {
    /// Whole class string, appended to the node's initial classes
    Text(ValueSource),
    /// Per-token switches; tokens not listed are left alone
    Tokens(Vec<(String, ValueSource)>),
}

/// `style` binding value
#[derive(Debug, Clone)]
pub enum StyleValue {
    /// Whole declaration text, appended to the node's initial style
    Text(ValueSource),
    /// Per-property values; properties not listed are left alone
    Properties(Vec<(String, ValueSource)>),
}

fn entries_eq(a: &[(String, ValueSource)], b: &[(String, ValueSource)]) -> bool {
    let covered = |from: &[(String, ValueSource)], to: &[(String, ValueSource)]| {
        from.iter().all(|(key, value)| {
            to.iter()
                .rev()
                .find(|(k, _)| k == key)
                .is_some_and(|(_, other)| other.same_as(value))
        })
    };
    covered(a, b) && covered(b, a)
}

impl ClassValue {
    /// Equal when every token maps to the same value in both
    pub(crate) fn shallow_eq(&self, other: &ClassValue) -> bool {
        match (self, other) {
            (ClassValue::Text(a), ClassValue::Text(b)) => a.same_as(b),
            (ClassValue::Tokens(a), ClassValue::Tokens(b)) => entries_eq(a, b),
            _ => false,
        }
    }
}

impl StyleValue {
    pub(crate) fn shallow_eq(&self, other: &StyleValue) -> bool {
        match (self, other) {
            (StyleValue::Text(a), StyleValue::Text(b)) => a.same_as(b),
            (StyleValue::Properties(a), StyleValue::Properties(b)) => entries_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Into<ValueSource>> From<T> for ClassValue {
    fn from(value: T) -> Self {
        ClassValue::Text(value.into())
    }
}

impl<T: Into<ValueSource>> From<T> for StyleValue {
    fn from(value: T) -> Self {
        StyleValue::Text(value.into())
    }
}

/// Content installed once per node
#[derive(Clone)]
pub enum Init {
    /// Parsed and set as inner HTML
    Html(String),
    /// Deep-cloned and appended
    Node(NodeId),
    /// Called with the node; its result, if any, is installed
    With(Rc<dyn Fn(NodeId, &Context) -> Option<Init>>),
}

impl Init {
    pub fn with(f: impl Fn(NodeId, &Context) -> Option<Init> + 'static) -> Self {
        Init::With(Rc::new(f))
    }
}

impl fmt::Debug for Init {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Init::Html(html) => f.debug_tuple("Html").field(html).finish(),
            Init::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Init::With(_) => f.write_str("With(..)"),
        }
    }
}

impl From<&str> for Init {
    fn from(html: &str) -> Self {
        Init::Html(html.to_string())
    }
}

impl From<String> for Init {
    fn from(html: String) -> Self {
        Init::Html(html)
    }
}

impl From<NodeId> for Init {
    fn from(node: NodeId) -> Self {
        Init::Node(node)
    }
}

/// Desired state of one node
#[derive(Clone, Default)]
#[must_use]
pub struct BindingResult {
    pub(crate) init: Option<Init>,
    pub(crate) props: Vec<(String, ValueSource)>,
    pub(crate) on: Vec<(String, Listener)>,
    pub(crate) attrs: Vec<(String, ValueSource)>,
    pub(crate) attr_shorthands: Vec<(&'static str, ValueSource)>,
    pub(crate) prop_shorthands: Vec<(&'static str, ValueSource)>,
    pub(crate) class: Option<ClassValue>,
    pub(crate) style: Option<StyleValue>,
    pub(crate) text: Option<ValueSource>,
    pub(crate) html: Option<ValueSource>,
    pub(crate) visible: Option<ValueSource>,
    pub(crate) listeners: Vec<(String, Listener)>,
    pub(crate) children: Option<ChildrenSpec>,
}

impl BindingResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn attr_shorthand(mut self, name: &'static str, value: impl Into<ValueSource>) -> Self {
        self.attr_shorthands.push((name, value.into()));
        self
    }

    fn prop_shorthand(mut self, name: &'static str, value: impl Into<ValueSource>) -> Self {
        self.prop_shorthands.push((name, value.into()));
        self
    }

    pub fn id(self, value: impl Into<ValueSource>) -> Self {
        self.attr_shorthand("id", value)
    }

    pub fn name(self, value: impl Into<ValueSource>) -> Self {
        self.attr_shorthand("name", value)
    }

    pub fn title(self, value: impl Into<ValueSource>) -> Self {
        self.attr_shorthand("title", value)
    }

    pub fn href(self, value: impl Into<ValueSource>) -> Self {
        self.attr_shorthand("href", value)
    }

    pub fn selected(self, value: impl Into<ValueSource>) -> Self {
        self.prop_shorthand("selected", value)
    }

    pub fn disabled(self, value: impl Into<ValueSource>) -> Self {
        self.prop_shorthand("disabled", value)
    }

    pub fn checked(self, value: impl Into<ValueSource>) -> Self {
        self.prop_shorthand("checked", value)
    }

    pub fn value(self, value: impl Into<ValueSource>) -> Self {
        self.prop_shorthand("value", value)
    }

    /// Replace text content
    pub fn text(mut self, value: impl Into<ValueSource>) -> Self {
        self.text = Some(value.into());
        self
    }

    /// Replace inner HTML
    pub fn html(mut self, value: impl Into<ValueSource>) -> Self {
        self.html = Some(value.into());
        self
    }

    /// Show or hide through the configured hidden class
    pub fn visible(mut self, value: impl Into<ValueSource>) -> Self {
        self.visible = Some(value.into());
        self
    }

    pub fn class(mut self, value: impl Into<ClassValue>) -> Self {
        self.class = Some(value.into());
        self
    }

    /// Switch a single class token. Replaces a whole-string class value.
    pub fn class_token(mut self, token: impl Into<String>, on: impl Into<ValueSource>) -> Self {
        let entry = (token.into(), on.into());
        match &mut self.class {
            Some(ClassValue::Tokens(tokens)) => tokens.push(entry),
            _ => self.class = Some(ClassValue::Tokens(vec![entry])),
        }
        self
    }

    pub fn style(mut self, value: impl Into<StyleValue>) -> Self {
        self.style = Some(value.into());
        self
    }

    /// Set a single style property. Replaces a whole-text style value.
    pub fn style_property(mut self, name: impl Into<String>, value: impl Into<ValueSource>) -> Self {
        let entry = (name.into(), value.into());
        match &mut self.style {
            Some(StyleValue::Properties(props)) => props.push(entry),
            _ => self.style = Some(StyleValue::Properties(vec![entry])),
        }
        self
    }

    pub fn init(mut self, init: impl Into<Init>) -> Self {
        self.init = Some(init.into());
        self
    }

    pub fn init_with(self, f: impl Fn(NodeId, &Context) -> Option<Init> + 'static) -> Self {
        self.init(Init::with(f))
    }

    /// Event handler. Names starting with `$` add a listener instead of
    /// occupying the `on<event>` slot.
    pub fn on(self, event: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        self.on_listener(event, Listener::new(handler))
    }

    /// Event handler with a caller-owned identity, so an unchanged
    /// listener is not re-registered on the next pass
    pub fn on_listener(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.on.push((event.into(), listener));
        self
    }

    /// Shorthand listener (`@event`), applied after all value keys
    pub fn listen(mut self, event: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        let event = event.into();
        let event = event.strip_prefix('@').map(str::to_string).unwrap_or(event);
        self.listeners.push((event, Listener::new(handler)));
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<ValueSource>) -> Self {
        self.props.push((name.into(), value.into()));
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<ValueSource>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn children(mut self, children: ChildrenSpec) -> Self {
        self.children = Some(children);
        self
    }

    /// Set a value key by name. Unknown keys are logged and ignored.
    pub fn set(self, key: &str, value: impl Into<ValueSource>) -> Self {
        if let Some(name) = ATTRIBUTE_SHORTHANDS.iter().find(|k| **k == key) {
            return self.attr_shorthand(name, value);
        }
        if let Some(name) = PROPERTY_SHORTHANDS.iter().find(|k| **k == key) {
            return self.prop_shorthand(name, value);
        }
        match key {
            "text" => self.text(value),
            "html" => self.html(value),
            "visible" => self.visible(value),
            "class" => self.class(ClassValue::Text(value.into())),
            "style" => self.style(StyleValue::Text(value.into())),
            _ => {
                tracing::warn!("Ignoring unknown binding key: {}", key);
                self
            }
        }
    }

    /// True when nothing would be applied
    pub fn is_empty(&self) -> bool {
        self.init.is_none()
            && self.props.is_empty()
            && self.on.is_empty()
            && self.attrs.is_empty()
            && self.attr_shorthands.is_empty()
            && self.prop_shorthands.is_empty()
            && self.class.is_none()
            && self.style.is_none()
            && self.text.is_none()
            && self.html.is_none()
            && self.visible.is_none()
            && self.listeners.is_empty()
            && self.children.is_none()
    }
}

impl fmt::Debug for BindingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingResult")
            .field("init", &self.init)
            .field("props", &self.props)
            .field("attrs", &self.attrs)
            .field("class", &self.class)
            .field("style", &self.style)
            .field("text", &self.text)
            .field("html", &self.html)
            .field("visible", &self.visible)
            .field("children", &self.children.is_some())
            .finish_non_exhaustive()
    }
}

/// Return types accepted from binding functions
pub trait IntoBindingResult {
    fn into_binding_result(self) -> Option<BindingResult>;
}

impl IntoBindingResult for BindingResult {
    fn into_binding_result(self) -> Option<BindingResult> {
        Some(self)
    }
}

impl IntoBindingResult for Option<BindingResult> {
    fn into_binding_result(self) -> Option<BindingResult> {
        self
    }
}

impl IntoBindingResult for () {
    fn into_binding_result(self) -> Option<BindingResult> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_routes_shorthands() {
        let result = BindingResult::new()
            .set("id", "x")
            .set("checked", true)
            .set("text", 5)
            .set("bogus", 1);
        assert_eq!(result.attr_shorthands.len(), 1);
        assert_eq!(result.prop_shorthands.len(), 1);
        assert!(result.text.is_some());
    }

    #[test]
    fn test_token_patches_accumulate() {
        let result = BindingResult::new().class_token("a", true).class_token("b", false);
        match result.class {
            Some(ClassValue::Tokens(tokens)) => assert_eq!(tokens.len(), 2),
            other => panic!("unexpected class value: {other:?}"),
        }
    }

    #[test]
    fn test_token_maps_compare_key_by_key() {
        let a = ClassValue::Tokens(vec![("x".into(), true.into()), ("y".into(), false.into())]);
        let b = ClassValue::Tokens(vec![("y".into(), false.into()), ("x".into(), true.into())]);
        let c = ClassValue::Tokens(vec![("x".into(), true.into())]);
        assert!(a.shallow_eq(&b));
        assert!(!a.shallow_eq(&c));
        assert!(!c.shallow_eq(&a));
        assert!(!a.shallow_eq(&ClassValue::from("x")));
    }

    #[test]
    fn test_listen_strips_marker() {
        let result = BindingResult::new().listen("@click", |_| {});
        assert_eq!(result.listeners[0].0, "click");
        assert!(!result.is_empty());
        assert!(BindingResult::new().is_empty());
    }
}
