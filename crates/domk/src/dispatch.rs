//! Dispatch batching
//!
//! Every dispatch runs inside a [`DispatchScope`]. Root updaters queued
//! while any scope is open run once each, deduplicated by component, when
//! the outermost scope closes. Closing happens in `Drop`, so the flush also
//! runs when an action panics. An async dispatch stays open as an
//! [`InFlight`] until its future and every async dispatch nested in it have
//! settled; dispatches made under it render nothing until then.

use std::cell::Cell;
use std::rc::Rc;

use domk_dom::NodeId;

use crate::component::ComponentId;
use crate::context::Context;
use crate::host::WeakHost;

/// Passed to the `dispatched` observer after each dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent {
    /// Root component whose context dispatched
    pub component: ComponentId,
    /// Root container of that component
    pub container: NodeId,
    /// Type name of the action, or of the message sent
    pub action: &'static str,
}

#[derive(Default)]
pub(crate) struct DispatchBatch {
    depth: usize,
    pending: Vec<(ComponentId, Rc<dyn Fn()>)>,
}

impl DispatchBatch {
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    fn enter(&mut self) {
        if self.depth == 0 {
            self.pending.clear();
        }
        self.depth += 1;
    }

    fn leave(&mut self) -> usize {
        self.depth = self.depth.saturating_sub(1);
        self.depth
    }

    /// Pending updaters, once no scope is open
    fn take_if_idle(&mut self) -> Option<Vec<(ComponentId, Rc<dyn Fn()>)>> {
        (self.depth == 0).then(|| std::mem::take(&mut self.pending))
    }

    pub(crate) fn enqueue(&mut self, component: ComponentId, update: Rc<dyn Fn()>) {
        if !self.pending.iter().any(|(id, _)| *id == component) {
            self.pending.push((component, update));
        }
    }
}

/// Open dispatch transaction; closing it may flush pending updates
pub(crate) struct DispatchScope<'a> {
    cx: &'a Context,
    action: &'static str,
}

impl<'a> DispatchScope<'a> {
    pub(crate) fn enter(cx: &'a Context, action: &'static str) -> Self {
        cx.host().with_batch(DispatchBatch::enter);
        tracing::trace!("Dispatch {} (depth {})", action, cx.host().with_batch(|b| b.depth()));
        Self { cx, action }
    }

    /// Queue the root updater of the dispatching context
    pub(crate) fn enqueue_root(&self) {
        let (component, update) = self.cx.root_updater();
        self.cx.host().with_batch(|batch| batch.enqueue(component, update));
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        let host = self.cx.host();
        let depth = host.with_batch(DispatchBatch::leave);
        if let Some(observer) = self.cx.dispatched_observer() {
            observer(&DispatchEvent {
                component: self.cx.root_component(),
                container: self.cx.root_container(),
                action: self.action,
            });
        }
        if depth > 0 {
            return;
        }
        // The observer may have dispatched on its own
        let Some(pending) = host.with_batch(DispatchBatch::take_if_idle) else {
            return;
        };
        if !pending.is_empty() {
            tracing::debug!("Flushing {} batched update(s)", pending.len());
        }
        for (_, update) in pending {
            update();
        }
    }
}

/// Outermost async dispatch that has not settled yet
pub(crate) struct InFlight {
    outstanding: Cell<usize>,
    component: ComponentId,
    update: Rc<dyn Fn()>,
    host: WeakHost,
}

impl InFlight {
    pub(crate) fn new(cx: &Context) -> Rc<Self> {
        let (component, update) = cx.root_updater();
        Rc::new(Self {
            outstanding: Cell::new(1),
            component,
            update,
            host: cx.host().downgrade(),
        })
    }

    /// Register an async dispatch nested in this one
    pub(crate) fn join(&self) {
        self.outstanding.set(self.outstanding.get() + 1);
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    /// One future settled; the last one re-renders the root
    fn settle(&self) {
        let left = self.outstanding.get().saturating_sub(1);
        self.outstanding.set(left);
        if left > 0 {
            return;
        }
        let Some(host) = self.host.upgrade() else { return };
        tracing::trace!("Async dispatch settled; updating {}", self.component);
        if host.with_batch(|batch| batch.depth()) > 0 {
            host.with_batch(|batch| batch.enqueue(self.component, self.update.clone()));
        } else {
            (self.update)();
        }
    }
}

/// Settles its [`InFlight`] when dropped, whether the future completed or
/// was torn down with the executor
pub(crate) struct Settle(pub(crate) Rc<InFlight>);

impl Drop for Settle {
    fn drop(&mut self) {
        self.0.settle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    #[test]
    fn test_enqueue_dedupes_by_component() {
        let mut batch = DispatchBatch::default();
        let (a, b) = (ComponentId::next(), ComponentId::next());
        batch.enter();
        batch.enqueue(a, noop());
        batch.enqueue(b, noop());
        batch.enqueue(a, noop());
        batch.leave();
        let pending = batch.take_if_idle().unwrap();
        assert_eq!(pending.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_nested_scopes_flush_at_outermost() {
        let mut batch = DispatchBatch::default();
        batch.enter();
        batch.enter();
        batch.enqueue(ComponentId::next(), noop());
        assert_eq!(batch.leave(), 1);
        assert!(batch.take_if_idle().is_none());
        assert_eq!(batch.leave(), 0);
        assert_eq!(batch.take_if_idle().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_outermost_entry_clears_stale_pending() {
        let mut batch = DispatchBatch::default();
        batch.enqueue(ComponentId::next(), noop());
        batch.enter();
        batch.leave();
        assert_eq!(batch.take_if_idle().map(|p| p.len()), Some(0));
    }
}
