//! Models
//!
//! A component renders from a [`ModelSource`]: a fixed value, a thunk
//! re-invoked on every update, or an [`ObservableModel`] it subscribes to.
//! [`Store`] is a small observable state container.

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::subscription::Subscription;

/// Custom dispatch entry point of an observable model
pub type Dispatcher = Rc<dyn Fn(Box<dyn Any>)>;

/// Observable state consumed by components
pub trait ObservableModel<M> {
    /// Current state snapshot
    fn get_state(&self) -> Rc<M>;

    /// Call `listener` after every state change until the handle drops
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;

    /// Message-based dispatch, when the model has one
    fn dispatcher(&self) -> Option<Dispatcher> {
        None
    }
}

/// Where a component gets its model
pub enum ModelSource<M> {
    Value(Rc<M>),
    Thunk(Rc<dyn Fn() -> M>),
    Observable(Rc<dyn ObservableModel<M>>),
}

impl<M> Clone for ModelSource<M> {
    fn clone(&self) -> Self {
        match self {
            ModelSource::Value(v) => ModelSource::Value(v.clone()),
            ModelSource::Thunk(f) => ModelSource::Thunk(f.clone()),
            ModelSource::Observable(o) => ModelSource::Observable(o.clone()),
        }
    }
}

impl<M> fmt::Debug for ModelSource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ModelSource::Value(_) => "Value",
            ModelSource::Thunk(_) => "Thunk",
            ModelSource::Observable(_) => "Observable",
        };
        write!(f, "ModelSource::{}<{}>", kind, type_name::<M>())
    }
}

impl<M> ModelSource<M> {
    pub fn value(model: M) -> Self {
        ModelSource::Value(Rc::new(model))
    }

    pub fn thunk(f: impl Fn() -> M + 'static) -> Self {
        ModelSource::Thunk(Rc::new(f))
    }

    pub fn observable(model: impl ObservableModel<M> + 'static) -> Self {
        ModelSource::Observable(Rc::new(model))
    }
}

impl<M: 'static> From<Store<M>> for ModelSource<M> {
    fn from(store: Store<M>) -> Self {
        ModelSource::Observable(Rc::new(store))
    }
}

type Reducer<S> = Rc<dyn Fn(&S, &dyn Any) -> Option<S>>;

struct StoreInner<S> {
    state: RefCell<Rc<S>>,
    listeners: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
    next_listener: Cell<u64>,
    reducer: Option<Reducer<S>>,
}

/// Observable state container
pub struct Store<S>(Rc<StoreInner<S>>);

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S: 'static> Store<S> {
    pub fn new(state: S) -> Self {
        Self::build(state, None)
    }

    /// Store whose `dispatch` runs `reducer` for actions of type `A`.
    /// A reduction equal to the current state does not notify.
    pub fn with_reducer<A: 'static>(state: S, reducer: impl Fn(&S, &A) -> S + 'static) -> Self
    where
        S: PartialEq,
    {
        let reducer: Reducer<S> = Rc::new(move |state: &S, action: &dyn Any| {
            let Some(action) = action.downcast_ref::<A>() else {
                tracing::warn!("Store<{}> ignored a message that is not {}", type_name::<S>(), type_name::<A>());
                return None;
            };
            Some(reducer(state, action)).filter(|next| next != state)
        });
        Self::build(state, Some(reducer))
    }

    fn build(state: S, reducer: Option<Reducer<S>>) -> Self {
        Self(Rc::new(StoreInner {
            state: RefCell::new(Rc::new(state)),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            reducer,
        }))
    }

    pub fn get(&self) -> Rc<S> {
        self.0.state.borrow().clone()
    }

    /// Modify a copy of the state; notifies only when it changed
    pub fn update(&self, f: impl FnOnce(&mut S)) -> bool
    where
        S: Clone + PartialEq,
    {
        let current = self.get();
        let mut next = (*current).clone();
        f(&mut next);
        if next == *current {
            return false;
        }
        self.commit(next);
        true
    }

    /// Set one field; notifies only when the value differs
    pub fn set_field<T: PartialEq>(&self, field: impl Fn(&mut S) -> &mut T, value: T) -> bool
    where
        S: Clone,
    {
        let mut next = (*self.get()).clone();
        let slot = field(&mut next);
        if *slot == value {
            return false;
        }
        *slot = value;
        self.commit(next);
        true
    }

    /// Swap in a whole new state with one notification
    pub fn replace(&self, state: S) {
        self.commit(state);
    }

    /// Run the reducer with `action`. Returns whether the state changed.
    pub fn dispatch<A: Any>(&self, action: A) -> bool {
        self.dispatch_boxed(&action)
    }

    fn dispatch_boxed(&self, action: &dyn Any) -> bool {
        let Some(reducer) = &self.0.reducer else {
            tracing::warn!("Store<{}> has no reducer; dispatch ignored", type_name::<S>());
            return false;
        };
        let current = self.get();
        match reducer(&current, action) {
            Some(next) => {
                self.commit(next);
                true
            }
            None => false,
        }
    }

    fn commit(&self, state: S) {
        *self.0.state.borrow_mut() = Rc::new(state);
        self.notify();
    }

    fn notify(&self) {
        let listeners: Vec<_> = self.0.listeners.borrow().iter().map(|(_, l)| l.clone()).collect();
        tracing::trace!("Store<{}> notifying {} listener(s)", type_name::<S>(), listeners.len());
        for listener in listeners {
            listener();
        }
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.add_listener(Rc::new(listener))
    }

    fn add_listener(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let id = self.0.next_listener.get();
        self.0.next_listener.set(id + 1);
        self.0.listeners.borrow_mut().push((id, listener));
        let weak: Weak<StoreInner<S>> = Rc::downgrade(&self.0);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(l, _)| *l != id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }
}

impl<S: 'static> ObservableModel<S> for Store<S> {
    fn get_state(&self) -> Rc<S> {
        self.get()
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.add_listener(listener)
    }

    fn dispatcher(&self) -> Option<Dispatcher> {
        self.0.reducer.as_ref()?;
        let weak = Rc::downgrade(&self.0);
        Some(Rc::new(move |message: Box<dyn Any>| {
            if let Some(inner) = weak.upgrade() {
                Store(inner).dispatch_boxed(message.as_ref());
            }
        }))
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.0.state.borrow())
            .field("listeners", &self.0.listeners.borrow().len())
            .finish()
    }
}
