//! Node updater
//!
//! Applies one [`BindingResult`] to one node. Every write goes through the
//! node's previous-value cache first, so re-applying an unchanged result
//! leaves the tree untouched.

use domk_dom::{Listener, NodeId, NodeOperations, Value};

use crate::children::{self, ChildrenSpec};
use crate::context::Context;
use crate::dynamic::{DynamicValue, Sink, ValueSource};
use crate::host::Host;
use crate::node_data::{BindingKey, InitialData, Previous, Template};
use crate::result::{BindingResult, ClassValue, Init, StyleValue};

/// Where a value is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Text,
    Html,
    Attr(String),
    Prop(String),
    ClassToken(String),
    StyleProp(String),
    Visible,
    Class,
    Style,
}

impl Target {
    /// Previous-value and dynamic-registration slot
    fn slot(&self) -> String {
        match self {
            Target::Text => "text".to_string(),
            Target::Html => "html".to_string(),
            Target::Attr(name) => format!("a:{name}"),
            Target::Prop(name) => format!("p:{name}"),
            Target::ClassToken(token) => format!("c:{token}"),
            Target::StyleProp(name) => format!("s:{name}"),
            Target::Visible => "visible".to_string(),
            Target::Class => "class".to_string(),
            Target::Style => "style".to_string(),
        }
    }
}

/// Apply `result` to `node`
pub(crate) fn update_node(cx: &Context, node: NodeId, binding: BindingKey, result: &BindingResult) {
    let host = cx.host();
    capture_initial(host, node);

    if let Some(init) = &result.init {
        run_init(cx, node, binding, init);
    }
    for (name, value) in &result.props {
        update_value(host, node, Target::Prop(name.clone()), value);
    }
    for (name, listener) in &result.on {
        update_event(host, node, name, listener);
    }
    for (name, value) in &result.attrs {
        update_value(host, node, Target::Attr(name.clone()), value);
    }
    for (name, value) in &result.attr_shorthands {
        update_value(host, node, Target::Attr(name.to_string()), value);
    }
    for (name, value) in &result.prop_shorthands {
        update_value(host, node, Target::Prop(name.to_string()), value);
    }
    if let Some(class) = &result.class {
        update_class(host, node, class);
    }
    if let Some(style) = &result.style {
        update_style(host, node, style);
    }
    if let Some(text) = &result.text {
        update_value(host, node, Target::Text, text);
    }
    if let Some(html) = &result.html {
        update_value(host, node, Target::Html, html);
    }
    if let Some(visible) = &result.visible {
        update_value(host, node, Target::Visible, visible);
    }
    for (name, listener) in &result.listeners {
        update_event(host, node, name, listener);
    }
    if let Some(children) = &result.children {
        update_children(cx, node, binding, children);
    }
}

fn capture_initial(host: &Host, node: NodeId) -> InitialData {
    if let Some(initial) = host.with_nodes(|nodes| nodes.initial_data(node)) {
        return initial;
    }
    let initial = host.with_tree(|tree| InitialData {
        class: tree.get_attribute(node, "class").unwrap_or_default().trim().to_string(),
        style: tree.get_attribute(node, "style").unwrap_or_default().trim().to_string(),
    });
    host.with_nodes(|nodes| nodes.set_initial_data(node, initial))
}

fn run_init(cx: &Context, node: NodeId, binding: BindingKey, init: &Init) {
    let host = cx.host();
    if !host.with_nodes(|nodes| nodes.begin_init(node, binding)) {
        return;
    }
    let content = match init {
        Init::With(f) => f(node, cx),
        other => Some(other.clone()),
    };
    let content = match content {
        Some(Init::With(_)) => {
            tracing::warn!("Init function for {} returned another function; ignored", node);
            return;
        }
        Some(content) => content,
        None => return,
    };
    // Several bindings may target one node; content goes in once
    if !host.with_nodes(|nodes| nodes.claim_content(node)) {
        tracing::trace!("Content of {} already initialized", node);
        return;
    }
    match content {
        Init::Html(html) => host.set_inner_html(node, &html),
        Init::Node(source) => {
            host.mutate(|tree| {
                let copy = tree.clone_node(source, true)?;
                tree.append_child(node, copy)
            });
        }
        Init::With(_) => {}
    }
}

fn update_value(host: &Host, node: NodeId, target: Target, source: &ValueSource) {
    let slot = target.slot();
    if host.with_nodes(|nodes| nodes.refresh(node, &slot, Previous::from(source))) {
        apply_source(host, node, target, source);
    }
}

fn apply_source(host: &Host, node: NodeId, target: Target, source: &ValueSource) {
    match source {
        ValueSource::Static(value) => {
            let superseded = host.with_nodes(|nodes| nodes.retire_dynamic(node, &target.slot()));
            drop(superseded);
            apply(host, node, &target, value.clone());
        }
        ValueSource::Dynamic(dynamic) => bind_dynamic(host, node, target, dynamic),
    }
}

/// Subscribe `target` to `source`, replacing any earlier registration for
/// the same slot. Deliveries for a replaced registration are dropped.
fn bind_dynamic(host: &Host, node: NodeId, target: Target, source: &DynamicValue) {
    let slot = target.slot();
    let (generation, superseded) = host.with_nodes(|nodes| nodes.begin_dynamic(node, &slot));
    drop(superseded);

    let weak = host.downgrade();
    let sink_slot = slot.clone();
    let sink: Sink = std::rc::Rc::new(move |value: Value| {
        let Some(host) = weak.upgrade() else { return };
        if host.with_nodes(|nodes| nodes.is_current(node, &sink_slot, generation)) {
            apply(&host, node, &target, value);
        } else {
            tracing::trace!("Dropped stale value for {} on {}", sink_slot, node);
        }
    });
    let subscription = source.subscribe(sink);
    let stale = host.with_nodes(|nodes| nodes.attach(node, &slot, generation, subscription));
    drop(stale);
}

/// Write `value` to `target` on `node`
fn apply(host: &Host, node: NodeId, target: &Target, value: Value) {
    match target {
        Target::Text => host.set_text_content(node, &value.to_text()),
        Target::Html => host.set_inner_html(node, &value.to_text()),
        Target::Attr(name) => {
            host.mutate(|tree| {
                if value.is_null() {
                    tree.remove_attribute(node, name)
                } else {
                    tree.set_attribute(node, name, &value.to_text())
                }
            });
        }
        Target::Prop(name) => {
            host.mutate(|tree| tree.set_property(node, name, value));
        }
        Target::ClassToken(token) => {
            host.mutate(|tree| tree.toggle_class(node, token, value.is_truthy()));
        }
        Target::StyleProp(name) => {
            host.mutate(|tree| tree.set_style_property(node, name, &value.to_text()));
        }
        Target::Visible => {
            let hidden = &host.config().hidden_class;
            host.mutate(|tree| tree.toggle_class(node, hidden, !value.is_truthy()));
        }
        Target::Class => {
            let initial = capture_initial(host, node).class;
            let class = join(&initial, value.to_text().trim(), " ");
            host.mutate(|tree| tree.set_attribute(node, "class", &class));
        }
        Target::Style => {
            let initial = capture_initial(host, node).style;
            let style = join(initial.trim_end_matches(';'), value.to_text().trim(), "; ");
            host.mutate(|tree| tree.set_attribute(node, "style", &style));
        }
    }
}

fn join(initial: &str, value: &str, separator: &str) -> String {
    match (initial.is_empty(), value.is_empty()) {
        (true, _) => value.to_string(),
        (false, true) => initial.to_string(),
        (false, false) => format!("{initial}{separator}{value}"),
    }
}

fn update_class(host: &Host, node: NodeId, class: &ClassValue) {
    if !host.with_nodes(|nodes| nodes.refresh(node, "class", Previous::Class(class.clone()))) {
        return;
    }
    match class {
        ClassValue::Text(source) => apply_source(host, node, Target::Class, source),
        ClassValue::Tokens(tokens) => {
            for (token, on) in tokens {
                apply_source(host, node, Target::ClassToken(token.clone()), on);
            }
        }
    }
}

fn update_style(host: &Host, node: NodeId, style: &StyleValue) {
    if !host.with_nodes(|nodes| nodes.refresh(node, "style", Previous::Style(style.clone()))) {
        return;
    }
    match style {
        StyleValue::Text(source) => apply_source(host, node, Target::Style, source),
        StyleValue::Properties(props) => {
            for (name, value) in props {
                apply_source(host, node, Target::StyleProp(name.clone()), value);
            }
        }
    }
}

/// Event names starting with `$` add a listener; others use the single
/// `on<event>` handler slot
fn update_event(host: &Host, node: NodeId, name: &str, listener: &Listener) {
    let slot = format!("e:{name}");
    let Some(previous) = host.with_nodes(|nodes| nodes.replace_listener(node, &slot, listener)) else {
        return;
    };
    match name.strip_prefix('$') {
        Some(event) => host.mutate(|tree| {
            if let Some(previous) = &previous {
                tree.remove_listener(node, event, previous)?;
            }
            tree.add_listener(node, event, listener.clone())
        }),
        None => host.mutate(|tree| tree.set_handler(node, name, Some(listener.clone()))),
    };
}

fn update_children(cx: &Context, node: NodeId, binding: BindingKey, spec: &ChildrenSpec) {
    let host = cx.host();
    let template = match host.with_nodes(|nodes| nodes.template(node, binding)) {
        Template::Captured(template) => template,
        Template::Missing => return,
        Template::Pending => match capture_template(host, node, binding) {
            Some(template) => template,
            None => return,
        },
    };
    children::reconcile(cx, node, binding, template, spec);
}

/// Clone the first element child as the list template, then empty the node
fn capture_template(host: &Host, node: NodeId, binding: BindingKey) -> Option<NodeId> {
    let first = host.with_tree(|tree| tree.first_element_child(node));
    let Some(first) = first else {
        tracing::warn!("No template element under {}; children ignored", node);
        host.with_nodes(|nodes| nodes.set_template(node, binding, Template::Missing));
        return None;
    };
    let marker = &host.config().template_class;
    let template = host.mutate(|tree| {
        let template = tree.clone_node(first, true)?;
        tree.toggle_class(template, marker, false)?;
        if tree.get_attribute(template, "class") == Some("") {
            tree.remove_attribute(template, "class")?;
        }
        Ok(template)
    })?;
    let removed = host.mutate(|tree| Ok(tree.clear_children(node))).unwrap_or_default();
    host.release(&removed);
    host.with_nodes(|nodes| nodes.set_template(node, binding, Template::Captured(template)));
    tracing::debug!("Captured list template {} under {}", template, node);
    Some(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_namespaced() {
        assert_eq!(Target::Attr("id".into()).slot(), "a:id");
        assert_eq!(Target::Prop("id".into()).slot(), "p:id");
        assert_ne!(Target::ClassToken("x".into()).slot(), Target::StyleProp("x".into()).slot());
    }

    #[test]
    fn test_join_with_initial_text() {
        assert_eq!(join("", "a", " "), "a");
        assert_eq!(join("base", "", " "), "base");
        assert_eq!(join("base", "extra", " "), "base extra");
        assert_eq!(join("color: red", "width: 1px", "; "), "color: red; width: 1px");
    }
}
