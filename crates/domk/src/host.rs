//! Host document
//!
//! A [`Host`] owns the document that bindings mutate together with all the
//! engine's side state for it: the selector cache, the node data store, the
//! dispatch batch and a local executor for asynchronous values. It is the
//! per-document scope; hosts never share batching state.

use std::cell::{Ref, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use domk_css::{query_selector, query_selector_all};
use domk_dom::{Document, DomResult, DomTree, Event, NodeId, NodeOperations, Value};
use smol::{LocalExecutor, Task};

use crate::children::Key;
use crate::config::Config;
use crate::dispatch::DispatchBatch;
use crate::error::{DomkError, Result};
use crate::node_data::NodeDataStore;
use crate::query::{SelectorCache, THIS};

struct HostInner {
    document: RefCell<Document>,
    config: Config,
    queries: RefCell<SelectorCache>,
    nodes: RefCell<NodeDataStore>,
    batch: RefCell<DispatchBatch>,
    executor: LocalExecutor<'static>,
}

/// Shared handle to a bound document
#[derive(Clone)]
pub struct Host(Rc<HostInner>);

/// Non-owning handle, held by callbacks stored inside the document
#[derive(Clone)]
pub(crate) struct WeakHost(Weak<HostInner>);

impl WeakHost {
    pub(crate) fn upgrade(&self) -> Option<Host> {
        self.0.upgrade().map(Host)
    }
}

impl Host {
    pub fn new(document: Document) -> Self {
        Self::with_config(document, Config::default())
    }

    pub fn with_config(document: Document, config: Config) -> Self {
        let host = Self(Rc::new(HostInner {
            document: RefCell::new(document),
            config,
            queries: RefCell::new(SelectorCache::default()),
            nodes: RefCell::new(NodeDataStore::default()),
            batch: RefCell::new(DispatchBatch::default()),
            executor: LocalExecutor::new(),
        }));
        if host.0.config.inject_styles {
            host.inject_styles();
        }
        host
    }

    /// Parse `html` into a fresh document
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self::new(domk_html::parse(html)?))
    }

    pub fn parse_with_config(html: &str, config: Config) -> Result<Self> {
        Ok(Self::with_config(domk_html::parse(html)?, config))
    }

    /// Insert the stylesheet element once per document
    fn inject_styles(&self) {
        let config = &self.0.config;
        let mut doc = self.0.document.borrow_mut();
        if doc.get_element_by_id(&config.style_element_id).is_some() {
            return;
        }
        let parent = doc.head().or_else(|| doc.body()).unwrap_or(NodeId::ROOT);
        let tree = doc.tree_mut();
        let style = tree.create_element("style");
        let text = tree.create_text(&config.stylesheet());
        let installed = tree
            .set_attribute(style, "id", &config.style_element_id)
            .and_then(|_| tree.set_attribute(style, "type", "text/css"))
            .and_then(|_| tree.append_child(style, text))
            .and_then(|_| tree.append_child(parent, style));
        match installed {
            Ok(_) => tracing::debug!("Injected domk stylesheet into {}", parent),
            Err(err) => tracing::warn!("Failed to inject stylesheet: {}", err),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakHost {
        WeakHost(Rc::downgrade(&self.0))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn ptr_eq(&self, other: &Host) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.0.document.borrow()
    }

    /// Read access to the tree for the duration of `f`
    pub fn with_tree<R>(&self, f: impl FnOnce(&DomTree) -> R) -> R {
        f(self.0.document.borrow().tree())
    }

    /// Apply a tree mutation and drop cached query results. Failures are
    /// logged and yield `None`.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut DomTree) -> DomResult<R>) -> Option<R> {
        let outcome = f(self.0.document.borrow_mut().tree_mut());
        self.invalidate();
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Skipped DOM update: {}", err);
                None
            }
        }
    }

    pub(crate) fn invalidate(&self) {
        self.0.queries.borrow_mut().invalidate();
    }

    pub(crate) fn with_nodes<R>(&self, f: impl FnOnce(&mut NodeDataStore) -> R) -> R {
        f(&mut self.0.nodes.borrow_mut())
    }

    pub(crate) fn with_batch<R>(&self, f: impl FnOnce(&mut DispatchBatch) -> R) -> R {
        f(&mut self.0.batch.borrow_mut())
    }

    /// Document (root) node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document().body()
    }

    /// Tree mutation counter
    pub fn generation(&self) -> u64 {
        self.with_tree(DomTree::generation)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Nodes matched by `selector` within `container`. `"this"` yields the
    /// container; a leading `>` is relative to it. Invalid selectors are
    /// logged and match nothing.
    pub fn query(&self, container: NodeId, selector: &str, all: bool) -> Vec<NodeId> {
        match self.try_query(container, selector, all) {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::warn!("{}", err);
                Vec::new()
            }
        }
    }

    pub fn try_query(&self, container: NodeId, selector: &str, all: bool) -> Result<Vec<NodeId>> {
        if selector.trim() == THIS {
            return Ok(vec![container]);
        }
        let generation = self.generation();
        let cached = self.0.queries.borrow().lookup(container, selector, all, generation);
        if let Some(nodes) = cached {
            return Ok(nodes);
        }
        let parsed = self.0.queries.borrow_mut().parse(selector);
        let list = parsed.map_err(|source| DomkError::Selector {
            selector: selector.to_string(),
            source,
        })?;
        let nodes = self.with_tree(|tree| {
            if all {
                query_selector_all(tree, container, &list)
            } else {
                query_selector(tree, container, &list).into_iter().collect()
            }
        });
        tracing::trace!("query {:?} in {} matched {} node(s)", selector, container, nodes.len());
        self.0.queries.borrow_mut().store(container, selector, all, generation, &nodes);
        Ok(nodes)
    }

    pub fn query_one(&self, container: NodeId, selector: &str) -> Option<NodeId> {
        self.query(container, selector, false).into_iter().next()
    }

    pub fn query_all(&self, container: NodeId, selector: &str) -> Vec<NodeId> {
        self.query(container, selector, true)
    }

    // ------------------------------------------------------------------
    // Node reads
    // ------------------------------------------------------------------

    pub fn text_content(&self, node: NodeId) -> String {
        self.with_tree(|tree| tree.text_content(node))
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        self.with_tree(|tree| tree.inner_html(node))
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        self.with_tree(|tree| tree.outer_html(node))
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_tree(|tree| tree.get_attribute(node, name).map(str::to_string))
    }

    pub fn property(&self, node: NodeId, name: &str) -> Value {
        self.with_tree(|tree| tree.property(node, name))
    }

    pub fn has_class(&self, node: NodeId, token: &str) -> bool {
        self.with_tree(|tree| tree.has_class(node, token))
    }

    pub fn style_property(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_tree(|tree| tree.style(node).get_property_value(name).map(str::to_string))
    }

    /// Keys of the lists rendered into `node`, in order
    pub fn child_keys(&self, node: NodeId) -> Vec<Key> {
        self.with_nodes(|nodes| nodes.child_keys(node))
    }

    /// Node rendered for `key` in a list under `node`
    pub fn child_node(&self, node: NodeId, key: &Key) -> Option<NodeId> {
        self.with_nodes(|nodes| nodes.child_node(node, key))
    }

    // ------------------------------------------------------------------
    // Engine writes that detach nodes
    // ------------------------------------------------------------------

    /// Drop side-table records for detached nodes and their subtrees, then
    /// return their arena slots
    pub(crate) fn release(&self, detached: &[NodeId]) {
        if detached.is_empty() {
            return;
        }
        let subtree: Vec<NodeId> = self.with_tree(|tree| {
            detached
                .iter()
                .flat_map(|&node| std::iter::once(node).chain(tree.descendants(node)))
                .collect()
        });
        let released = self.with_nodes(|nodes| nodes.release(&subtree));
        tracing::trace!("Released {} record(s) for {} node(s)", released.len(), subtree.len());
        drop(released);
        let freed = self
            .mutate(|tree| Ok(detached.iter().map(|&node| tree.free_subtree(node)).sum::<usize>()))
            .unwrap_or_default();
        tracing::trace!("Freed {} arena slot(s)", freed);
    }

    pub fn set_text_content(&self, node: NodeId, text: &str) {
        if let Some(removed) = self.mutate(|tree| tree.set_text_content(node, text)) {
            self.release(&removed);
        }
    }

    /// Replace the children of `node` with parsed HTML
    pub fn set_inner_html(&self, node: NodeId, html: &str) {
        let (removed, parsed) = {
            let mut doc = self.0.document.borrow_mut();
            let tree = doc.tree_mut();
            let removed = tree.clear_children(node);
            (removed, domk_html::parse_fragment_into(tree, node, html))
        };
        self.invalidate();
        if let Err(err) = parsed {
            tracing::warn!("Failed to set inner HTML of {}: {}", node, err);
        }
        self.release(&removed);
    }

    /// Detach `child` from `parent` and forget its records. The id goes stale.
    pub fn remove_node(&self, parent: NodeId, child: NodeId) {
        if self.mutate(|tree| tree.remove_child(parent, child)).is_some() {
            self.release(&[child]);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Fire a bubbling event at `target`. Returns false when a listener
    /// called `prevent_default`.
    pub fn dispatch_event(&self, target: NodeId, kind: &str) -> bool {
        self.mutate(|tree| tree.activate(target, kind));
        let event = Event::new(kind, target);
        let path = self.with_tree(|tree| tree.event_path(&event));
        tracing::trace!("Dispatching {} at {} ({} node path)", kind, target, path.len());
        for node in path {
            let listeners = self.with_tree(|tree| tree.listeners(node, kind));
            event.set_current_target(node);
            for listener in listeners {
                listener.call(&event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        !event.default_prevented()
    }

    pub fn click(&self, target: NodeId) -> bool {
        self.dispatch_event(target, "click")
    }

    // ------------------------------------------------------------------
    // Executor
    // ------------------------------------------------------------------

    pub fn spawn<T: 'static>(&self, future: impl Future<Output = T> + 'static) -> Task<T> {
        self.0.executor.spawn(future)
    }

    /// Run ready tasks until none can make progress
    pub fn run_until_stalled(&self) {
        while self.0.executor.try_tick() {}
    }

    /// Drive `future` to completion while running spawned tasks
    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        smol::block_on(self.0.executor.run(future))
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("url", &self.document().url())
            .field("config", &self.0.config)
            .finish_non_exhaustive()
    }
}
