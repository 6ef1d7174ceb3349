//! DOM Events
//!
//! Event objects and listener handles. Dispatch itself is driven by the
//! owner of the tree so that no borrow of the tree is held while listeners
//! run.

use std::cell::Cell;
use std::rc::Rc;

use crate::NodeId;

/// Event delivered to listeners
#[derive(Debug)]
pub struct Event {
    kind: String,
    target: NodeId,
    current_target: Cell<NodeId>,
    bubbles: bool,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    /// Create a bubbling event
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            current_target: Cell::new(target),
            bubbles: true,
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Create an event that only reaches its target
    pub fn non_bubbling(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            bubbles: false,
            ..Self::new(kind, target)
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target.get()
    }

    pub fn set_current_target(&self, node: NodeId) {
        self.current_target.set(node);
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Shared event listener. Identity (not behavior) decides equality.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[inline]
    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

impl<F: Fn(&Event) + 'static> From<F> for Listener {
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_identity() {
        let a = Listener::new(|_| {});
        let b = a.clone();
        let c = Listener::new(|_| {});
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_event_flags() {
        let event = Event::new("click", NodeId::new(3, 0));
        assert!(event.bubbles());
        event.stop_propagation();
        assert!(event.is_propagation_stopped());
        assert!(!Event::non_bubbling("focus", NodeId::new(3, 0)).bubbles());
    }
}
