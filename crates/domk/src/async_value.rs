//! Asynchronous binding values
//!
//! [`async_value`] turns a future into a dynamic value that shows a loading
//! placeholder until the future settles on the host executor.
//! [`stream_value`] pushes every item of a stream.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use domk_dom::Value;
use smol::stream::{Stream, StreamExt};

use crate::dynamic::{DynamicSource, DynamicValue, Sink, ValueSource};
use crate::host::Host;
use crate::subscription::Subscription;

/// Placeholders shown by an [`AsyncValue`]
#[derive(Debug, Clone, Default)]
pub struct AsyncOptions {
    loading: Value,
    error: Option<Value>,
}

impl AsyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shown until the future settles
    pub fn loading(mut self, value: impl Into<Value>) -> Self {
        self.loading = value.into();
        self
    }

    /// Shown if the future fails; the error text otherwise
    pub fn error(mut self, value: impl Into<Value>) -> Self {
        self.error = Some(value.into());
        self
    }
}

enum Outcome<T> {
    Pending,
    Ready(Rc<T>),
    Failed(String),
}

/// Listeners keyed by registration id
struct Waiters<W> {
    next: Cell<u64>,
    list: RefCell<Vec<(u64, W)>>,
}

impl<W: Clone + 'static> Waiters<W> {
    fn new() -> Self {
        Self {
            next: Cell::new(0),
            list: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, waiter: W) -> u64 {
        let id = self.next.get();
        self.next.set(id + 1);
        self.list.borrow_mut().push((id, waiter));
        id
    }

    fn remove(&self, id: u64) {
        self.list.borrow_mut().retain(|(w, _)| *w != id);
    }

    fn snapshot(&self) -> Vec<W> {
        self.list.borrow().iter().map(|(_, w)| w.clone()).collect()
    }
}

struct Pending<T> {
    outcome: RefCell<Outcome<T>>,
    waiters: Waiters<Rc<dyn Fn()>>,
}

impl<T> Pending<T> {
    fn settle(&self, outcome: Outcome<T>) {
        *self.outcome.borrow_mut() = outcome;
        let waiters: Vec<_> = self.waiters.list.borrow_mut().drain(..).map(|(_, w)| w).collect();
        tracing::trace!("Async value settled; {} waiter(s)", waiters.len());
        for waiter in waiters {
            waiter();
        }
    }
}

/// Value of a future, bindable through [`AsyncValue::value`] or
/// [`AsyncValue::map`]
pub struct AsyncValue<T> {
    shared: Rc<Pending<T>>,
    options: AsyncOptions,
}

impl<T> Clone for AsyncValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            options: self.options.clone(),
        }
    }
}

/// Run `future` on the host executor and expose its result as a value
pub fn async_value<T, E>(
    host: &Host,
    future: impl Future<Output = Result<T, E>> + 'static,
    options: AsyncOptions,
) -> AsyncValue<T>
where
    T: 'static,
    E: fmt::Display + 'static,
{
    let shared = Rc::new(Pending {
        outcome: RefCell::new(Outcome::Pending),
        waiters: Waiters::new(),
    });
    let weak: Weak<Pending<T>> = Rc::downgrade(&shared);
    host.spawn(async move {
        let outcome = match future.await {
            Ok(value) => Outcome::Ready(Rc::new(value)),
            Err(err) => {
                tracing::warn!("Async value failed: {}", err);
                Outcome::Failed(err.to_string())
            }
        };
        if let Some(shared) = weak.upgrade() {
            shared.settle(outcome);
        }
    })
    .detach();
    AsyncValue { shared, options }
}

impl<T: 'static> AsyncValue<T> {
    /// The settled value, if any
    pub fn get(&self) -> Option<Rc<T>> {
        match &*self.shared.outcome.borrow() {
            Outcome::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(&*self.shared.outcome.borrow(), Outcome::Pending)
    }

    /// The whole result
    pub fn value(&self) -> DynamicValue
    where
        T: Clone + Into<Value>,
    {
        self.project(Rc::new(|value: &T| value.clone().into()), self.options.loading.clone())
    }

    /// A projection of the result, with its own loading placeholder
    pub fn map<V: Into<Value>>(&self, f: impl Fn(&T) -> V + 'static, loading: impl Into<Value>) -> DynamicValue {
        self.project(Rc::new(move |value: &T| f(value).into()), loading.into())
    }

    fn project(&self, project: Rc<dyn Fn(&T) -> Value>, loading: Value) -> DynamicValue {
        DynamicValue::new(Projection {
            shared: self.shared.clone(),
            project,
            loading,
            error: self.options.error.clone(),
        })
    }
}

impl<T: Clone + Into<Value> + 'static> From<AsyncValue<T>> for ValueSource {
    fn from(value: AsyncValue<T>) -> Self {
        ValueSource::Dynamic(value.value())
    }
}

impl<T> fmt::Debug for AsyncValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.outcome.borrow() {
            Outcome::Pending => "pending",
            Outcome::Ready(_) => "ready",
            Outcome::Failed(_) => "failed",
        };
        f.debug_struct("AsyncValue")
            .field("state", &state)
            .field("options", &self.options)
            .finish()
    }
}

struct Projection<T> {
    shared: Rc<Pending<T>>,
    project: Rc<dyn Fn(&T) -> Value>,
    loading: Value,
    error: Option<Value>,
}

impl<T> Projection<T> {
    fn current(&self) -> Option<Value> {
        match &*self.shared.outcome.borrow() {
            Outcome::Pending => None,
            Outcome::Ready(value) => Some((self.project)(value)),
            Outcome::Failed(message) => Some(self.error.clone().unwrap_or_else(|| Value::from(message.as_str()))),
        }
    }
}

impl<T: 'static> DynamicSource for Projection<T> {
    fn subscribe(&self, sink: Sink) -> Subscription {
        if let Some(value) = self.current() {
            sink(value);
            return Subscription::empty();
        }
        sink(self.loading.clone());

        let resolved = Projection {
            shared: self.shared.clone(),
            project: self.project.clone(),
            loading: Value::Null,
            error: self.error.clone(),
        };
        let id = self.shared.waiters.add(Rc::new(move || {
            if let Some(value) = resolved.current() {
                sink(value);
            }
        }));
        let weak = Rc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.waiters.remove(id);
            }
        })
    }

    /// Projections of one future compare equal across passes
    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.shared) as *const ()
    }
}

struct Latest {
    value: RefCell<Value>,
    sinks: Waiters<Sink>,
}

struct StreamSource(Rc<Latest>);

impl DynamicSource for StreamSource {
    fn subscribe(&self, sink: Sink) -> Subscription {
        let current = self.0.value.borrow().clone();
        sink(current);
        let id = self.0.sinks.add(sink);
        let weak = Rc::downgrade(&self.0);
        Subscription::new(move || {
            if let Some(latest) = weak.upgrade() {
                latest.sinks.remove(id);
            }
        })
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

/// Push every item of `stream` to the bound targets, starting from `initial`
pub fn stream_value<V: Into<Value>>(
    host: &Host,
    stream: impl Stream<Item = V> + 'static,
    initial: impl Into<Value>,
) -> DynamicValue {
    let latest = Rc::new(Latest {
        value: RefCell::new(initial.into()),
        sinks: Waiters::new(),
    });
    let weak = Rc::downgrade(&latest);
    let mut stream = Box::pin(stream);
    host.spawn(async move {
        while let Some(item) = stream.next().await {
            let Some(latest) = weak.upgrade() else { break };
            let value: Value = item.into();
            *latest.value.borrow_mut() = value.clone();
            for sink in latest.sinks.snapshot() {
                sink(value.clone());
            }
        }
    })
    .detach();
    DynamicValue::new(StreamSource(latest))
}
